//! Order error types.

use common::{ErrorKind, TransactionId};
use coordinator::{CoordinatorError, ParticipantError};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order with this ID.
    #[error("Order not found: {0}")]
    NotFound(TransactionId),

    /// The coordinator refused an operation or a participant failed a phase.
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// A participant rejected the staging step.
    #[error("Participant error: {0}")]
    Participant(#[from] ParticipantError),
}

impl OrderError {
    /// Returns the logical kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::Coordinator(err) => err.kind(),
            OrderError::Participant(err) => err.kind(),
        }
    }
}

/// Convenience type alias for order results.
pub type Result<T> = std::result::Result<T, OrderError>;
