//! HTTP route handlers.

pub mod agents;
pub mod health;
pub mod inventory;
pub mod metrics;
pub mod orders;
pub mod transactions;
