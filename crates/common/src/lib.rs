//! Shared types for the two-phase-commit workspace.
//!
//! Identifiers used by the coordinator, the participants and the order
//! orchestrator, plus the logical error taxonomy every layer reports.

pub mod kind;
pub mod types;

pub use kind::ErrorKind;
pub use types::{AgentId, ItemId, TransactionId};
