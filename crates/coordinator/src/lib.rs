//! Two-phase-commit transaction coordination.
//!
//! This crate provides the pieces one orchestrator needs to atomically
//! commit or roll back work spread over several resource managers:
//! - [`TransactionState`], the state machine shared by the coordinator and
//!   every participant
//! - [`Participant`], the capability contract a resource manager implements
//! - [`ParticipantTracker`], reusable per-transaction bookkeeping that
//!   concrete participants compose
//! - [`Coordinator`], the transaction registry that drives prepare, commit
//!   and abort across the enlisted participants
//!
//! ```text
//! begin ──► enlist* ──► prepare ──┬──► commit
//!                                 └──► abort
//! ```

pub mod coordinator;
pub mod error;
pub mod participant;
pub mod state;
pub mod tracker;
pub mod transaction;

pub use coordinator::Coordinator;
pub use error::{CoordinatorError, ParticipantError};
pub use participant::Participant;
pub use state::TransactionState;
pub use tracker::ParticipantTracker;
pub use transaction::{Transaction, TransactionInfo};
