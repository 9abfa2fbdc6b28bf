//! Resource managers that take part in order transactions.
//!
//! - [`Store`] reserves inventory at prepare time and returns it on abort.
//! - [`Delivery`] holds a delivery agent from assignment until commit or
//!   abort.
//!
//! Both compose a [`coordinator::ParticipantTracker`] and implement
//! [`coordinator::Participant`].

pub mod delivery;
pub mod store;

pub use delivery::{Delivery, DeliveryAgent};
pub use store::{ItemQuantities, Store};
