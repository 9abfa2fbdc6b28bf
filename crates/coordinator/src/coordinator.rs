//! Transaction registry and two-phase-commit driver.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::TransactionId;
use tokio::sync::RwLock;

use crate::error::{CoordinatorError, Result};
use crate::participant::Participant;
use crate::state::TransactionState;
use crate::transaction::{Transaction, TransactionInfo};

/// Coordinates two-phase commits across registered participants.
///
/// The registry locks only guard map structure. Every state change happens
/// under the transaction's own lock, taken after the registry lock has been
/// released, so operations on different transactions never wait on each
/// other.
#[derive(Default)]
pub struct Coordinator {
    transactions: RwLock<HashMap<TransactionId, Arc<Transaction>>>,
    participants: RwLock<HashMap<String, Arc<dyn Participant>>>,
}

impl Coordinator {
    /// Creates a coordinator with no transactions and no participants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a participant addressable by name in `enlist` and `prepare`.
    ///
    /// Registering a name twice replaces the earlier participant for
    /// transactions that enlist it afterwards.
    pub async fn register_participant(
        &self,
        name: impl Into<String>,
        participant: Arc<dyn Participant>,
    ) {
        let name = name.into();
        tracing::debug!(participant = %name, "participant registered");
        self.participants.write().await.insert(name, participant);
    }

    /// Returns the registered participant names, sorted.
    pub async fn participant_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.participants.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registers a new transaction in `Initialized`.
    ///
    /// The timeout is recorded but never enforced.
    #[tracing::instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn begin(
        &self,
        transaction_id: TransactionId,
        timeout: Duration,
    ) -> Result<TransactionInfo> {
        let tx = {
            let mut transactions = self.transactions.write().await;
            if transactions.contains_key(&transaction_id) {
                return Err(CoordinatorError::AlreadyExists(transaction_id));
            }
            let tx = Arc::new(Transaction::new(transaction_id.clone(), timeout));
            transactions.insert(transaction_id, Arc::clone(&tx));
            tx
        };

        metrics::counter!("transactions_begun_total").increment(1);
        tracing::info!("transaction begun");
        Ok(tx.info().await)
    }

    /// Records that a participant holds staged work for the transaction, so
    /// that `commit` and `abort` reach it.
    ///
    /// Only allowed while the transaction is `Initialized`. Enlisting the
    /// same participant twice is a no-op.
    #[tracing::instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn enlist(&self, transaction_id: &TransactionId, participant: &str) -> Result<()> {
        let tx = self.lookup(transaction_id).await?;
        let resolved = self.resolve(&[participant]).await?;

        let mut inner = tx.write().await;
        if !inner.state.can_prepare() {
            return Err(CoordinatorError::InvalidState {
                transaction_id: transaction_id.clone(),
                expected: "Initialized",
                actual: inner.state,
            });
        }

        for (name, participant) in &resolved {
            if inner.enlist(name, participant) {
                tracing::debug!(participant = %name, "participant enlisted");
            }
        }
        Ok(())
    }

    /// Phase one: asks every named participant to prepare.
    ///
    /// The named participants are enlisted first. Participants are asked in
    /// order and the call stops at the first rejection, leaving the
    /// transaction `Initialized`; the caller must then `abort` it. Only when
    /// every participant accepts does the transaction become `Prepared`.
    #[tracing::instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn prepare(&self, transaction_id: &TransactionId, participants: &[&str]) -> Result<()> {
        let tx = self.lookup(transaction_id).await?;
        let resolved = self.resolve(participants).await?;

        let mut inner = tx.write().await;
        if !inner.state.can_prepare() {
            return Err(CoordinatorError::InvalidState {
                transaction_id: transaction_id.clone(),
                expected: "Initialized",
                actual: inner.state,
            });
        }

        for (name, participant) in &resolved {
            inner.enlist(name, participant);
        }

        for (name, participant) in &resolved {
            if let Err(source) = participant.prepare(transaction_id).await {
                record_participant_failure(name, "prepare");
                tracing::warn!(participant = %name, error = %source, "participant rejected prepare");
                return Err(CoordinatorError::Participant {
                    participant: name.clone(),
                    source,
                });
            }
        }

        inner.state = TransactionState::Prepared;
        tracing::info!("transaction prepared");
        Ok(())
    }

    /// Phase two: commits every enlisted participant.
    ///
    /// Requires `Prepared`. Once started, the decision is final: every
    /// enlisted participant is driven and the transaction lands in
    /// `Committed`, with the first participant failure (if any) returned.
    #[tracing::instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn commit(&self, transaction_id: &TransactionId) -> Result<()> {
        let tx = self.lookup(transaction_id).await?;

        let mut inner = tx.write().await;
        if !inner.state.can_commit() {
            return Err(CoordinatorError::InvalidState {
                transaction_id: transaction_id.clone(),
                expected: "Prepared",
                actual: inner.state,
            });
        }

        let mut first_failure = None;
        for enlisted in &inner.participants {
            if let Err(source) = enlisted.participant.commit(transaction_id).await {
                record_participant_failure(&enlisted.name, "commit");
                tracing::error!(participant = %enlisted.name, error = %source, "participant failed to commit");
                first_failure.get_or_insert(CoordinatorError::Participant {
                    participant: enlisted.name.clone(),
                    source,
                });
            }
        }

        inner.state = TransactionState::Committed;
        metrics::counter!("transactions_committed_total").increment(1);
        tracing::info!("transaction committed");

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Aborts the transaction, compensating every enlisted participant in
    /// reverse enlistment order.
    ///
    /// Allowed from `Initialized` or `Prepared`. Aborting an already aborted
    /// transaction is a no-op that touches no participant. A committed
    /// transaction cannot be aborted, even though abort otherwise drives
    /// participants whatever the prior state.
    #[tracing::instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn abort(&self, transaction_id: &TransactionId) -> Result<()> {
        let tx = self.lookup(transaction_id).await?;

        let mut inner = tx.write().await;
        match inner.state {
            TransactionState::Aborted => {
                tracing::debug!("transaction already aborted");
                return Ok(());
            }
            TransactionState::Committed => {
                return Err(CoordinatorError::InvalidState {
                    transaction_id: transaction_id.clone(),
                    expected: "Initialized or Prepared",
                    actual: inner.state,
                });
            }
            TransactionState::Initialized | TransactionState::Prepared => {}
        }

        let mut first_failure = None;
        for enlisted in inner.participants.iter().rev() {
            if let Err(source) = enlisted.participant.abort(transaction_id).await {
                record_participant_failure(&enlisted.name, "abort");
                tracing::error!(participant = %enlisted.name, error = %source, "participant failed to abort");
                first_failure.get_or_insert(CoordinatorError::Participant {
                    participant: enlisted.name.clone(),
                    source,
                });
            }
        }

        inner.state = TransactionState::Aborted;
        metrics::counter!("transactions_aborted_total").increment(1);
        tracing::warn!("transaction aborted");

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Returns the coordinator's view of the transaction state.
    pub async fn state(&self, transaction_id: &TransactionId) -> Result<TransactionState> {
        let tx = self.lookup(transaction_id).await?;
        Ok(tx.state().await)
    }

    /// Returns a snapshot of the transaction.
    pub async fn transaction(&self, transaction_id: &TransactionId) -> Result<TransactionInfo> {
        let tx = self.lookup(transaction_id).await?;
        Ok(tx.info().await)
    }

    /// Returns the number of registered transactions.
    pub async fn transaction_count(&self) -> usize {
        self.transactions.read().await.len()
    }

    /// Finds a transaction, releasing the registry lock before returning.
    async fn lookup(&self, transaction_id: &TransactionId) -> Result<Arc<Transaction>> {
        self.transactions
            .read()
            .await
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| CoordinatorError::NotFound(transaction_id.clone()))
    }

    /// Resolves participant names, failing on the first unknown one.
    async fn resolve(&self, names: &[&str]) -> Result<Vec<(String, Arc<dyn Participant>)>> {
        let participants = self.participants.read().await;
        names
            .iter()
            .map(|name| {
                participants
                    .get(*name)
                    .map(|p| (name.to_string(), Arc::clone(p)))
                    .ok_or_else(|| CoordinatorError::ParticipantNotFound(name.to_string()))
            })
            .collect()
    }
}

fn record_participant_failure(participant: &str, phase: &'static str) {
    metrics::counter!(
        "participant_failures_total",
        "participant" => participant.to_string(),
        "phase" => phase
    )
    .increment(1);
}
