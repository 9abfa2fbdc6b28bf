//! The participant capability contract.

use async_trait::async_trait;
use common::TransactionId;

use crate::error::ParticipantError;
use crate::state::TransactionState;

/// A resource manager that can take part in a two-phase commit.
///
/// Every call is keyed by transaction ID. Implementations keep their own
/// per-transaction state, independent of the coordinator's view.
#[async_trait]
pub trait Participant: Send + Sync {
    /// Votes on the transaction, locking in the staged work on success.
    async fn prepare(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError>;

    /// Makes the prepared work final.
    async fn commit(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError>;

    /// Compensates any staged or prepared work. Always lands in `Aborted`.
    async fn abort(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError>;

    /// Returns this participant's local state for the transaction.
    async fn state(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionState, ParticipantError>;
}
