//! Logical error kinds shared by every layer.

use serde::{Deserialize, Serialize};

/// The logical category of a failure, independent of which component
/// surfaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Duplicate transaction ID, pending record, agent, etc.
    AlreadyExists,
    /// Unknown transaction, order, participant or pending record.
    NotFound,
    /// Operation attempted from a state that does not permit it.
    InvalidState,
    /// Malformed request (empty order, zero quantity).
    InvalidInput,
    /// The store cannot satisfy the requested quantities.
    InsufficientStock,
    /// No delivery agent is free to take the order.
    NoAgentsAvailable,
    /// The assigned agent can no longer be confirmed.
    AgentUnavailable,
}

impl ErrorKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::NoAgentsAvailable => "no_agents_available",
            ErrorKind::AgentUnavailable => "agent_unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
