//! The order record and its status.

use chrono::{DateTime, Utc};
use common::TransactionId;
use serde::{Deserialize, Serialize};
use services::ItemQuantities;

/// The status of an order.
///
/// ```text
/// Pending ──┬──► Confirmed
///           └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The transaction is still running.
    #[default]
    Pending,

    /// The transaction committed (terminal state).
    Confirmed,

    /// The transaction was aborted (terminal state).
    Failed,
}

impl OrderStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Failed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A food order. Its ID is also the ID of the transaction that fulfils it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: TransactionId,
    pub items: ItemQuantities,
    pub location: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order.
    pub fn new(id: TransactionId, items: ItemQuantities, location: impl Into<String>) -> Self {
        Self {
            id,
            items,
            location: location.into(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Total number of units across all items.
    pub fn total_units(&self) -> u64 {
        self.items.values().map(|q| u64::from(*q)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ItemId;

    #[test]
    fn test_new_order_is_pending() {
        let items = ItemQuantities::from([(ItemId::from("pizza"), 2), (ItemId::from("burger"), 1)]);
        let order = Order::new(TransactionId::from("t1"), items, "customer_location");

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.location, "customer_location");
        assert_eq!(order.total_units(), 3);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Confirmed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
        assert_eq!(OrderStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_order_json_shape() {
        let items = ItemQuantities::from([(ItemId::from("pizza"), 2)]);
        let order = Order::new(TransactionId::from("t1"), items, "home");

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["id"], "t1");
        assert_eq!(json["items"]["pizza"], 2);
        assert_eq!(json["status"], "pending");
    }
}
