//! Coordinator and participant error types.

use common::{AgentId, ErrorKind, ItemId, TransactionId};
use thiserror::Error;

use crate::state::TransactionState;

/// Errors a participant reports for its local part of a transaction.
#[derive(Debug, Error)]
pub enum ParticipantError {
    /// No local record exists for the transaction.
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// Work has already been staged for the transaction.
    #[error("Transaction already staged: {0}")]
    AlreadyExists(TransactionId),

    /// The local state does not permit the operation.
    #[error("Invalid state for transaction {transaction_id}: expected {expected}, actual {actual}")]
    InvalidState {
        transaction_id: TransactionId,
        expected: &'static str,
        actual: TransactionState,
    },

    /// The store cannot satisfy the requested quantity.
    #[error("Insufficient stock for {item}: requested {requested}, available {available}")]
    InsufficientStock {
        item: ItemId,
        requested: u32,
        available: u32,
    },

    /// Every delivery agent is busy.
    #[error("No delivery agents available")]
    NoAgentsAvailable,

    /// The assigned agent can no longer be confirmed.
    #[error("Delivery agent not available: {0}")]
    AgentUnavailable(AgentId),

    /// Unknown delivery agent.
    #[error("Delivery agent not found: {0}")]
    AgentNotFound(AgentId),

    /// An agent with this ID is already registered.
    #[error("Delivery agent already registered: {0}")]
    DuplicateAgent(AgentId),

    /// Requested quantity is zero.
    #[error("Invalid quantity {quantity} for {item}")]
    InvalidQuantity { item: ItemId, quantity: u32 },

    /// The order requests no items.
    #[error("Order has no items")]
    EmptyOrder,
}

impl ParticipantError {
    /// Returns the logical kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParticipantError::NotFound(_) | ParticipantError::AgentNotFound(_) => {
                ErrorKind::NotFound
            }
            ParticipantError::AlreadyExists(_) | ParticipantError::DuplicateAgent(_) => {
                ErrorKind::AlreadyExists
            }
            ParticipantError::InvalidState { .. } => ErrorKind::InvalidState,
            ParticipantError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ParticipantError::NoAgentsAvailable => ErrorKind::NoAgentsAvailable,
            ParticipantError::AgentUnavailable(_) => ErrorKind::AgentUnavailable,
            ParticipantError::InvalidQuantity { .. } | ParticipantError::EmptyOrder => {
                ErrorKind::InvalidInput
            }
        }
    }
}

/// Errors that can occur during coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// `begin` was called with an ID that is already registered.
    #[error("Transaction already exists: {0}")]
    AlreadyExists(TransactionId),

    /// The transaction ID is not registered.
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// No participant is registered under this name.
    #[error("Participant not registered: {0}")]
    ParticipantNotFound(String),

    /// The transaction is in a state that does not permit the operation.
    #[error("Invalid state for transaction {transaction_id}: expected {expected}, actual {actual}")]
    InvalidState {
        transaction_id: TransactionId,
        expected: &'static str,
        actual: TransactionState,
    },

    /// A participant rejected or failed a phase.
    #[error("Participant '{participant}' failed: {source}")]
    Participant {
        participant: String,
        #[source]
        source: ParticipantError,
    },
}

impl CoordinatorError {
    /// Returns the logical kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            CoordinatorError::NotFound(_) | CoordinatorError::ParticipantNotFound(_) => {
                ErrorKind::NotFound
            }
            CoordinatorError::InvalidState { .. } => ErrorKind::InvalidState,
            CoordinatorError::Participant { source, .. } => source.kind(),
        }
    }
}

/// Convenience type alias for coordinator results.
pub type Result<T> = std::result::Result<T, CoordinatorError>;
