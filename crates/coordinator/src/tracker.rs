//! Per-transaction state bookkeeping shared by concrete participants.

use std::collections::HashMap;

use async_trait::async_trait;
use common::TransactionId;
use tokio::sync::RwLock;

use crate::error::ParticipantError;
use crate::participant::Participant;
use crate::state::TransactionState;

/// Tracks one participant's local state for every transaction it has seen.
///
/// Enforces only the bookkeeping rules:
/// - `prepare` requires no record or `Initialized`
/// - `commit` requires `Prepared`
/// - `abort` always lands in `Aborted`
///
/// Concrete participants hold a tracker, apply their own resource effects,
/// then delegate the final transition to it.
#[derive(Debug, Default)]
pub struct ParticipantTracker {
    states: RwLock<HashMap<TransactionId, TransactionState>>,
}

impl ParticipantTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the transaction as `Initialized` unless it is already known.
    pub async fn track(&self, transaction_id: &TransactionId) {
        self.states
            .write()
            .await
            .entry(transaction_id.clone())
            .or_insert(TransactionState::Initialized);
    }

    /// Returns the local state, if any.
    pub async fn get(&self, transaction_id: &TransactionId) -> Option<TransactionState> {
        self.states.read().await.get(transaction_id).copied()
    }

    /// Fails unless `prepare` would be accepted.
    pub async fn ensure_can_prepare(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<(), ParticipantError> {
        match self.get(transaction_id).await {
            Some(actual) if !actual.can_prepare() => Err(ParticipantError::InvalidState {
                transaction_id: transaction_id.clone(),
                expected: "Initialized",
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Fails unless `commit` would be accepted.
    pub async fn ensure_can_commit(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<(), ParticipantError> {
        match self.get(transaction_id).await {
            Some(actual) if actual.can_commit() => Ok(()),
            Some(actual) => Err(ParticipantError::InvalidState {
                transaction_id: transaction_id.clone(),
                expected: "Prepared",
                actual,
            }),
            None => Err(ParticipantError::NotFound(transaction_id.clone())),
        }
    }

    /// Returns the number of transactions in the given state.
    pub async fn count(&self, state: TransactionState) -> usize {
        self.states
            .read()
            .await
            .values()
            .filter(|s| **s == state)
            .count()
    }
}

#[async_trait]
impl Participant for ParticipantTracker {
    async fn prepare(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError> {
        let mut states = self.states.write().await;

        if let Some(actual) = states.get(transaction_id).copied()
            && !actual.can_prepare()
        {
            return Err(ParticipantError::InvalidState {
                transaction_id: transaction_id.clone(),
                expected: "Initialized",
                actual,
            });
        }

        states.insert(transaction_id.clone(), TransactionState::Prepared);
        Ok(())
    }

    async fn commit(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError> {
        let mut states = self.states.write().await;

        match states.get(transaction_id).copied() {
            Some(actual) if actual.can_commit() => {
                states.insert(transaction_id.clone(), TransactionState::Committed);
                Ok(())
            }
            Some(actual) => Err(ParticipantError::InvalidState {
                transaction_id: transaction_id.clone(),
                expected: "Prepared",
                actual,
            }),
            None => Err(ParticipantError::NotFound(transaction_id.clone())),
        }
    }

    async fn abort(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError> {
        self.states
            .write()
            .await
            .insert(transaction_id.clone(), TransactionState::Aborted);
        Ok(())
    }

    async fn state(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionState, ParticipantError> {
        self.get(transaction_id)
            .await
            .ok_or_else(|| ParticipantError::NotFound(transaction_id.clone()))
    }
}
