//! A single distributed transaction held by the coordinator.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::TransactionId;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::participant::Participant;
use crate::state::TransactionState;

/// A participant that holds work for a transaction.
#[derive(Clone)]
pub(crate) struct Enlisted {
    pub(crate) name: String,
    pub(crate) participant: Arc<dyn Participant>,
}

/// Mutable part of a transaction, guarded by the transaction's own lock.
pub(crate) struct TransactionInner {
    pub(crate) state: TransactionState,
    pub(crate) participants: Vec<Enlisted>,
}

impl TransactionInner {
    /// Adds the participant unless it is already enlisted.
    pub(crate) fn enlist(&mut self, name: &str, participant: &Arc<dyn Participant>) -> bool {
        if self.participants.iter().any(|p| p.name == name) {
            return false;
        }
        self.participants.push(Enlisted {
            name: name.to_string(),
            participant: Arc::clone(participant),
        });
        true
    }

    fn participant_names(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.name.clone()).collect()
    }
}

/// A distributed transaction.
///
/// Identity, creation time and timeout never change. State and enlisted
/// participants live behind a per-transaction lock so that conflicting
/// writers on one transaction are serialized while unrelated transactions
/// proceed independently.
pub struct Transaction {
    id: TransactionId,
    created_at: DateTime<Utc>,
    timeout: Duration,
    inner: RwLock<TransactionInner>,
}

impl Transaction {
    /// Creates a transaction in `Initialized`.
    pub fn new(id: TransactionId, timeout: Duration) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            timeout,
            inner: RwLock::new(TransactionInner {
                state: TransactionState::Initialized,
                participants: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The requested timeout. Advisory only: nothing expires a transaction.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the current state.
    pub async fn state(&self) -> TransactionState {
        self.inner.read().await.state
    }

    /// Takes a point-in-time snapshot.
    pub async fn info(&self) -> TransactionInfo {
        let inner = self.inner.read().await;
        TransactionInfo {
            id: self.id.clone(),
            state: inner.state,
            created_at: self.created_at,
            timeout: self.timeout,
            participants: inner.participant_names(),
        }
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, TransactionInner> {
        self.inner.write().await
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    pub id: TransactionId,
    pub state: TransactionState,
    pub created_at: DateTime<Utc>,
    pub timeout: Duration,
    /// Enlisted participant names, in enlistment order.
    pub participants: Vec<String>,
}

impl TransactionInfo {
    /// When the advisory timeout elapses. Reported, never enforced.
    pub fn deadline(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.timeout)
            .ok()
            .and_then(|timeout| self.created_at.checked_add_signed(timeout))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_transaction_is_initialized() {
        let tx = Transaction::new(TransactionId::from("t1"), Duration::from_secs(60));
        assert_eq!(tx.state().await, TransactionState::Initialized);
        assert_eq!(tx.id().as_str(), "t1");
        assert_eq!(tx.timeout(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_info_snapshot() {
        let tx = Transaction::new(TransactionId::from("t1"), Duration::from_secs(600));
        let info = tx.info().await;

        assert_eq!(info.state, TransactionState::Initialized);
        assert!(info.participants.is_empty());
        assert_eq!(info.created_at, tx.created_at());
        assert_eq!(
            info.deadline() - info.created_at,
            chrono::Duration::seconds(600)
        );
    }

    #[test]
    fn test_deadline_saturates() {
        let info = TransactionInfo {
            id: TransactionId::from("t1"),
            state: TransactionState::Initialized,
            created_at: Utc::now(),
            timeout: Duration::MAX,
            participants: Vec::new(),
        };
        assert_eq!(info.deadline(), DateTime::<Utc>::MAX_UTC);
    }
}
