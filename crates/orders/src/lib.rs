//! Order placement on top of the two-phase-commit coordinator.
//!
//! [`OrderService::place_order`] ties one business action to one
//! transaction spanning the store and the delivery service:
//! 1. Stage the items with the store
//! 2. Assign a delivery agent
//! 3. Prepare both participants
//! 4. Commit
//!
//! Any failure aborts the transaction, which releases whatever was staged.

pub mod error;
pub mod order;
pub mod service;

pub use error::OrderError;
pub use order::{Order, OrderStatus};
pub use service::{DELIVERY_PARTICIPANT, DEFAULT_TIMEOUT, OrderService, STORE_PARTICIPANT};
