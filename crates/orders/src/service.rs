//! Order orchestrator.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use common::TransactionId;
use coordinator::{Coordinator, TransactionState};
use services::{Delivery, ItemQuantities, Store};
use tokio::sync::RwLock;

use crate::error::{OrderError, Result};
use crate::order::{Order, OrderStatus};

/// Name under which the store is registered with the coordinator.
pub const STORE_PARTICIPANT: &str = "store";

/// Name under which the delivery service is registered with the coordinator.
pub const DELIVERY_PARTICIPANT: &str = "delivery";

/// Advisory timeout recorded on every order transaction.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Places orders as two-phase-commit transactions over the store and the
/// delivery service.
///
/// This is the only component that compensates: every failure after
/// `begin` is followed by an abort before the error is returned.
pub struct OrderService {
    coordinator: Arc<Coordinator>,
    store: Arc<Store>,
    delivery: Arc<Delivery>,
    orders: RwLock<HashMap<TransactionId, Order>>,
    timeout: Duration,
}

impl OrderService {
    /// Creates an order service and registers the store and the delivery
    /// service with the coordinator.
    pub async fn new(
        coordinator: Arc<Coordinator>,
        store: Arc<Store>,
        delivery: Arc<Delivery>,
    ) -> Self {
        coordinator
            .register_participant(STORE_PARTICIPANT, store.clone())
            .await;
        coordinator
            .register_participant(DELIVERY_PARTICIPANT, delivery.clone())
            .await;

        Self {
            coordinator,
            store,
            delivery,
            orders: RwLock::new(HashMap::new()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the advisory timeout recorded on new transactions.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn delivery(&self) -> &Arc<Delivery> {
        &self.delivery
    }

    /// Places an order, committing the stock reservation and the agent
    /// assignment atomically.
    ///
    /// On success the returned order is `Confirmed`. On failure the
    /// transaction is aborted, the stored order is marked `Failed`, and the
    /// error that triggered the abort is returned.
    #[tracing::instrument(skip(self, items, location), fields(transaction_id = tracing::field::Empty))]
    pub async fn place_order(
        &self,
        items: ItemQuantities,
        location: impl Into<String>,
    ) -> Result<Order> {
        metrics::counter!("order_placements_total").increment(1);
        let started = std::time::Instant::now();
        let location = location.into();

        let order = self.register_order(items, location).await;
        let transaction_id = order.id.clone();
        tracing::Span::current().record("transaction_id", tracing::field::display(&transaction_id));

        if let Err(err) = self
            .coordinator
            .begin(transaction_id.clone(), self.timeout)
            .await
        {
            self.finish(&transaction_id, OrderStatus::Failed).await;
            metrics::counter!("orders_failed_total").increment(1);
            tracing::warn!(error = %err, "could not begin transaction");
            return Err(err.into());
        }

        match self.run_transaction(&order).await {
            Ok(()) => {
                let order = self
                    .finish(&transaction_id, OrderStatus::Confirmed)
                    .await
                    .unwrap_or(Order {
                        status: OrderStatus::Confirmed,
                        ..order
                    });

                let duration = started.elapsed().as_secs_f64();
                metrics::histogram!("order_placement_duration_seconds").record(duration);
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(duration, "order confirmed");
                Ok(order)
            }
            Err(err) => {
                tracing::warn!(error = %err, "order failed, aborting transaction");
                self.compensate(&transaction_id).await;
                self.finish(&transaction_id, OrderStatus::Failed).await;

                metrics::histogram!("order_placement_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                metrics::counter!("orders_failed_total").increment(1);
                Err(err)
            }
        }
    }

    /// Loads an order by ID.
    pub async fn get_order(&self, order_id: &TransactionId) -> Result<Order> {
        self.orders
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| OrderError::NotFound(order_id.clone()))
    }

    /// Returns every order, newest first.
    pub async fn list_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.read().await.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        orders
    }

    /// Stores a new pending order under a fresh ID.
    async fn register_order(&self, items: ItemQuantities, location: String) -> Order {
        let mut orders = self.orders.write().await;
        loop {
            let id = TransactionId::generate();
            if let Entry::Vacant(slot) = orders.entry(id.clone()) {
                let order = Order::new(id, items, location);
                slot.insert(order.clone());
                return order;
            }
        }
    }

    /// Stages work with each participant, then runs both phases.
    async fn run_transaction(&self, order: &Order) -> Result<()> {
        let id = &order.id;

        self.coordinator.enlist(id, STORE_PARTICIPANT).await?;
        self.store.place_order(id, order.items.clone()).await?;

        self.coordinator.enlist(id, DELIVERY_PARTICIPANT).await?;
        let agent_id = self.delivery.assign_agent(id, &order.location).await?;
        tracing::debug!(%agent_id, "staged");

        self.coordinator
            .prepare(id, &[STORE_PARTICIPANT, DELIVERY_PARTICIPANT])
            .await?;
        self.commit(id).await
    }

    /// Phase two. A participant failure after the coordinator has recorded
    /// `Committed` leaves the order confirmed; the decision cannot be undone.
    async fn commit(&self, transaction_id: &TransactionId) -> Result<()> {
        let Err(err) = self.coordinator.commit(transaction_id).await else {
            return Ok(());
        };

        match self.coordinator.state(transaction_id).await {
            Ok(TransactionState::Committed) => {
                metrics::counter!("commit_participant_failures_total").increment(1);
                tracing::error!(error = %err, "participant failed after commit decision");
                Ok(())
            }
            _ => Err(err.into()),
        }
    }

    /// Aborts the transaction. A failing abort does not replace the error
    /// the caller sees, but it is logged and counted.
    async fn compensate(&self, transaction_id: &TransactionId) {
        if let Err(err) = self.coordinator.abort(transaction_id).await {
            metrics::counter!("compensation_failures_total").increment(1);
            tracing::error!(error = %err, "compensating abort failed");
        }
    }

    /// Sets the final status, returning the updated order.
    async fn finish(&self, transaction_id: &TransactionId, status: OrderStatus) -> Option<Order> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(transaction_id)?;
        order.status = status;
        Some(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ErrorKind, ItemId};

    async fn setup() -> OrderService {
        let store = Arc::new(Store::new());
        store.add_item("pizza", 5).await;
        store.add_item("burger", 10).await;

        let delivery = Arc::new(Delivery::new());
        delivery.add_agent("agent1", "location1").await.unwrap();
        delivery.add_agent("agent2", "location2").await.unwrap();

        OrderService::new(Arc::new(Coordinator::new()), store, delivery).await
    }

    fn items(entries: &[(&str, u32)]) -> ItemQuantities {
        entries
            .iter()
            .map(|(item, quantity)| (ItemId::from(*item), *quantity))
            .collect()
    }

    #[tokio::test]
    async fn test_registers_participants() {
        let service = setup().await;
        assert_eq!(
            service.coordinator().participant_names().await,
            vec!["delivery", "store"]
        );
    }

    #[tokio::test]
    async fn test_happy_path() {
        let service = setup().await;

        let order = service
            .place_order(items(&[("pizza", 2), ("burger", 1)]), "customer_location")
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.location, "customer_location");
        assert_eq!(
            service.coordinator().state(&order.id).await.unwrap(),
            TransactionState::Committed
        );

        let stored = service.get_order(&order.id).await.unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn test_insufficient_stock_marks_failed() {
        let service = setup().await;

        let err = service
            .place_order(items(&[("pizza", 10)]), "customer_location")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let orders = service.list_orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Failed);
        assert_eq!(
            service.coordinator().state(&orders[0].id).await.unwrap(),
            TransactionState::Aborted
        );
    }

    #[tokio::test]
    async fn test_custom_timeout_recorded() {
        let service = setup().await.with_timeout(Duration::from_secs(30));

        let order = service
            .place_order(items(&[("pizza", 1)]), "home")
            .await
            .unwrap();
        let info = service.coordinator().transaction(&order.id).await.unwrap();
        assert_eq!(info.timeout, Duration::from_secs(30));
        assert_eq!(info.participants, vec!["store", "delivery"]);
    }

    #[tokio::test]
    async fn test_get_unknown_order() {
        let service = setup().await;
        let result = service.get_order(&TransactionId::from("missing")).await;
        assert!(matches!(result, Err(OrderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let service = setup().await;
        let first = service
            .place_order(items(&[("pizza", 1)]), "a")
            .await
            .unwrap();
        let second = service
            .place_order(items(&[("burger", 1)]), "b")
            .await
            .unwrap();

        let orders = service.list_orders().await;
        assert_eq!(orders.len(), 2);
        assert!(orders[0].created_at >= orders[1].created_at);
        assert!(orders.iter().any(|o| o.id == first.id));
        assert!(orders.iter().any(|o| o.id == second.id));
    }
}
