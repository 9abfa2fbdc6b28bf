//! Transaction state machine.

use serde::{Deserialize, Serialize};

/// The state of a transaction, as seen by the coordinator or by a single
/// participant.
///
/// State transitions:
/// ```text
/// Initialized ──► Prepared ──► Committed
///      │              │
///      └──────────────┴──► Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionState {
    /// Transaction registered, work may be staged.
    #[default]
    Initialized,

    /// Every participant voted yes; awaiting the commit decision.
    Prepared,

    /// Effects are final (terminal state).
    Committed,

    /// Effects were compensated (terminal state).
    Aborted,
}

impl TransactionState {
    /// Returns true if the transaction can be prepared in this state.
    pub fn can_prepare(&self) -> bool {
        matches!(self, TransactionState::Initialized)
    }

    /// Returns true if the transaction can be committed in this state.
    pub fn can_commit(&self) -> bool {
        matches!(self, TransactionState::Prepared)
    }

    /// Returns true if the transaction can be aborted in this state.
    pub fn can_abort(&self) -> bool {
        matches!(
            self,
            TransactionState::Initialized | TransactionState::Prepared
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::Aborted)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Initialized => "Initialized",
            TransactionState::Prepared => "Prepared",
            TransactionState::Committed => "Committed",
            TransactionState::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
