//! Inventory participant.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use common::{ItemId, TransactionId};
use coordinator::{Participant, ParticipantError, ParticipantTracker, TransactionState};
use tokio::sync::RwLock;

/// Requested quantity per item.
pub type ItemQuantities = BTreeMap<ItemId, u32>;

#[derive(Debug, Default)]
struct StoreState {
    items: HashMap<ItemId, u32>,
    pending: HashMap<TransactionId, ItemQuantities>,
}

impl StoreState {
    fn available(&self, item: &ItemId) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    fn check_stock(&self, requested: &ItemQuantities) -> Result<(), ParticipantError> {
        for (item, &quantity) in requested {
            let available = self.available(item);
            if available < quantity {
                return Err(ParticipantError::InsufficientStock {
                    item: item.clone(),
                    requested: quantity,
                    available,
                });
            }
        }
        Ok(())
    }
}

/// A food store.
///
/// `place_order` only records what a transaction wants. Stock is taken at
/// `prepare`, so an abort before prepare leaves inventory untouched and an
/// abort after prepare hands the reserved units back.
#[derive(Debug, Default)]
pub struct Store {
    tracker: ParticipantTracker,
    state: RwLock<StoreState>,
}

impl Store {
    /// Creates a store with no stock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds stock for an item.
    pub async fn add_item(&self, item: impl Into<ItemId>, quantity: u32) {
        let item = item.into();
        let mut state = self.state.write().await;
        let stock = state.items.entry(item.clone()).or_insert(0);
        *stock = stock.saturating_add(quantity);
        tracing::debug!(%item, quantity, total = *stock, "stock added");
    }

    /// Returns the quantity currently available for an item.
    pub async fn available(&self, item: &ItemId) -> u32 {
        self.state.read().await.available(item)
    }

    /// Returns a snapshot of all stock.
    pub async fn inventory(&self) -> ItemQuantities {
        self.state
            .read()
            .await
            .items
            .iter()
            .map(|(item, quantity)| (item.clone(), *quantity))
            .collect()
    }

    /// Returns the number of transactions holding a pending order.
    pub async fn pending_count(&self) -> usize {
        self.state.read().await.pending.len()
    }

    /// Returns the items pending for a transaction.
    pub async fn pending(&self, transaction_id: &TransactionId) -> Option<ItemQuantities> {
        self.state.read().await.pending.get(transaction_id).cloned()
    }

    /// Stages an order against a transaction without touching stock.
    ///
    /// Fails if the order is empty, asks for zero of anything, is already
    /// staged, or asks for more than is currently in stock.
    #[tracing::instrument(skip(self, items), fields(transaction_id = %transaction_id))]
    pub async fn place_order(
        &self,
        transaction_id: &TransactionId,
        items: ItemQuantities,
    ) -> Result<(), ParticipantError> {
        if items.is_empty() {
            return Err(ParticipantError::EmptyOrder);
        }
        if let Some((item, &quantity)) = items.iter().find(|(_, quantity)| **quantity == 0) {
            return Err(ParticipantError::InvalidQuantity {
                item: item.clone(),
                quantity,
            });
        }

        let mut state = self.state.write().await;

        if state.pending.contains_key(transaction_id) {
            return Err(ParticipantError::AlreadyExists(transaction_id.clone()));
        }

        if let Err(err) = state.check_stock(&items) {
            tracing::warn!(error = %err, "order rejected");
            return Err(err);
        }

        state.pending.insert(transaction_id.clone(), items);
        self.tracker.track(transaction_id).await;
        tracing::debug!("order staged");
        Ok(())
    }
}

#[async_trait]
impl Participant for Store {
    /// Re-validates stock and takes the reserved units out of inventory.
    #[tracing::instrument(skip(self), fields(participant = "store", transaction_id = %transaction_id))]
    async fn prepare(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError> {
        let mut state = self.state.write().await;

        let reserved = state
            .pending
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| ParticipantError::NotFound(transaction_id.clone()))?;

        self.tracker.ensure_can_prepare(transaction_id).await?;
        state.check_stock(&reserved)?;

        for (item, quantity) in &reserved {
            if let Some(stock) = state.items.get_mut(item) {
                *stock -= quantity;
            }
        }
        let units: u64 = reserved.values().map(|q| u64::from(*q)).sum();
        metrics::counter!("store_units_reserved_total").increment(units);

        self.tracker.prepare(transaction_id).await?;
        tracing::debug!(units, "stock reserved");
        Ok(())
    }

    /// Stock already left inventory at prepare; only the pending record goes.
    #[tracing::instrument(skip(self), fields(participant = "store", transaction_id = %transaction_id))]
    async fn commit(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError> {
        let mut state = self.state.write().await;

        self.tracker.ensure_can_commit(transaction_id).await?;
        state.pending.remove(transaction_id);

        self.tracker.commit(transaction_id).await
    }

    /// Returns prepared units to inventory and drops the pending record.
    #[tracing::instrument(skip(self), fields(participant = "store", transaction_id = %transaction_id))]
    async fn abort(&self, transaction_id: &TransactionId) -> Result<(), ParticipantError> {
        let mut state = self.state.write().await;

        if let Some(reserved) = state.pending.remove(transaction_id) {
            // Units only left inventory if prepare succeeded.
            if self.tracker.get(transaction_id).await == Some(TransactionState::Prepared) {
                for (item, quantity) in reserved {
                    let stock = state.items.entry(item).or_insert(0);
                    *stock = stock.saturating_add(quantity);
                }
                tracing::debug!("reserved stock returned");
            }
        }

        self.tracker.abort(transaction_id).await
    }

    async fn state(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionState, ParticipantError> {
        self.tracker.state(transaction_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(entries: &[(&str, u32)]) -> ItemQuantities {
        entries
            .iter()
            .map(|(item, quantity)| (ItemId::from(*item), *quantity))
            .collect()
    }

    async fn stocked_store() -> Store {
        let store = Store::new();
        store.add_item("pizza", 5).await;
        store.add_item("burger", 10).await;
        store
    }

    fn tx(id: &str) -> TransactionId {
        TransactionId::from(id)
    }

    #[tokio::test]
    async fn test_place_order_does_not_touch_stock() {
        let store = stocked_store().await;

        store
            .place_order(&tx("t1"), items(&[("pizza", 2), ("burger", 1)]))
            .await
            .unwrap();

        assert_eq!(store.available(&ItemId::from("pizza")).await, 5);
        assert_eq!(store.pending_count().await, 1);
        assert_eq!(
            store.state(&tx("t1")).await.unwrap(),
            TransactionState::Initialized
        );
    }

    #[tokio::test]
    async fn test_place_order_insufficient_stock() {
        let store = stocked_store().await;

        let result = store.place_order(&tx("t1"), items(&[("pizza", 10)])).await;
        assert!(matches!(
            result,
            Err(ParticipantError::InsufficientStock {
                requested: 10,
                available: 5,
                ..
            })
        ));
        assert_eq!(store.pending_count().await, 0);
        assert!(store.state(&tx("t1")).await.is_err());
    }

    #[tokio::test]
    async fn test_place_order_unknown_item_is_insufficient() {
        let store = stocked_store().await;
        let result = store.place_order(&tx("t1"), items(&[("sushi", 1)])).await;
        assert!(matches!(
            result,
            Err(ParticipantError::InsufficientStock { available: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_place_order_rejects_bad_input() {
        let store = stocked_store().await;

        let result = store.place_order(&tx("t1"), ItemQuantities::new()).await;
        assert!(matches!(result, Err(ParticipantError::EmptyOrder)));

        let result = store.place_order(&tx("t1"), items(&[("pizza", 0)])).await;
        assert!(matches!(
            result,
            Err(ParticipantError::InvalidQuantity { quantity: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_place_order_twice_fails() {
        let store = stocked_store().await;
        store
            .place_order(&tx("t1"), items(&[("pizza", 1)]))
            .await
            .unwrap();

        let result = store.place_order(&tx("t1"), items(&[("pizza", 1)])).await;
        assert!(matches!(result, Err(ParticipantError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_prepare_reserves_and_commit_finalizes() {
        let store = stocked_store().await;
        store
            .place_order(&tx("t1"), items(&[("pizza", 2), ("burger", 1)]))
            .await
            .unwrap();

        store.prepare(&tx("t1")).await.unwrap();
        assert_eq!(store.available(&ItemId::from("pizza")).await, 3);
        assert_eq!(store.available(&ItemId::from("burger")).await, 9);

        store.commit(&tx("t1")).await.unwrap();
        assert_eq!(store.pending_count().await, 0);
        assert_eq!(store.available(&ItemId::from("pizza")).await, 3);
        assert_eq!(
            store.state(&tx("t1")).await.unwrap(),
            TransactionState::Committed
        );
    }

    #[tokio::test]
    async fn test_prepare_without_order_not_found() {
        let store = stocked_store().await;
        let result = store.prepare(&tx("t1")).await;
        assert!(matches!(result, Err(ParticipantError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_prepare_revalidates_stock() {
        let store = stocked_store().await;
        store
            .place_order(&tx("t1"), items(&[("pizza", 4)]))
            .await
            .unwrap();
        store
            .place_order(&tx("t2"), items(&[("pizza", 4)]))
            .await
            .unwrap();

        store.prepare(&tx("t1")).await.unwrap();
        let result = store.prepare(&tx("t2")).await;

        assert!(matches!(
            result,
            Err(ParticipantError::InsufficientStock { available: 1, .. })
        ));
        assert_eq!(store.available(&ItemId::from("pizza")).await, 1);
    }

    #[tokio::test]
    async fn test_double_prepare_does_not_double_reserve() {
        let store = stocked_store().await;
        store
            .place_order(&tx("t1"), items(&[("pizza", 2)]))
            .await
            .unwrap();
        store.prepare(&tx("t1")).await.unwrap();

        let result = store.prepare(&tx("t1")).await;
        assert!(matches!(result, Err(ParticipantError::InvalidState { .. })));
        assert_eq!(store.available(&ItemId::from("pizza")).await, 3);
    }

    #[tokio::test]
    async fn test_commit_twice_fails_cleanly() {
        let store = stocked_store().await;
        store
            .place_order(&tx("t1"), items(&[("pizza", 2)]))
            .await
            .unwrap();
        store.prepare(&tx("t1")).await.unwrap();
        store.commit(&tx("t1")).await.unwrap();

        let result = store.commit(&tx("t1")).await;
        assert!(matches!(result, Err(ParticipantError::InvalidState { .. })));
        assert_eq!(store.available(&ItemId::from("pizza")).await, 3);
    }

    #[tokio::test]
    async fn test_commit_before_prepare_keeps_pending() {
        let store = stocked_store().await;
        store
            .place_order(&tx("t1"), items(&[("pizza", 2)]))
            .await
            .unwrap();

        let result = store.commit(&tx("t1")).await;
        assert!(matches!(result, Err(ParticipantError::InvalidState { .. })));
        assert_eq!(store.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_abort_after_prepare_returns_stock() {
        let store = stocked_store().await;
        store
            .place_order(&tx("t1"), items(&[("pizza", 2), ("burger", 1)]))
            .await
            .unwrap();
        store.prepare(&tx("t1")).await.unwrap();

        store.abort(&tx("t1")).await.unwrap();
        assert_eq!(store.available(&ItemId::from("pizza")).await, 5);
        assert_eq!(store.available(&ItemId::from("burger")).await, 10);
        assert_eq!(store.pending_count().await, 0);
        assert_eq!(
            store.state(&tx("t1")).await.unwrap(),
            TransactionState::Aborted
        );
    }

    #[tokio::test]
    async fn test_abort_before_prepare_leaves_stock() {
        let store = stocked_store().await;
        store
            .place_order(&tx("t1"), items(&[("pizza", 2)]))
            .await
            .unwrap();

        store.abort(&tx("t1")).await.unwrap();
        assert_eq!(store.available(&ItemId::from("pizza")).await, 5);
        assert_eq!(store.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_abort_twice_is_stable() {
        let store = stocked_store().await;
        store
            .place_order(&tx("t1"), items(&[("pizza", 2)]))
            .await
            .unwrap();
        store.prepare(&tx("t1")).await.unwrap();

        store.abort(&tx("t1")).await.unwrap();
        let once = store.inventory().await;
        store.abort(&tx("t1")).await.unwrap();
        assert_eq!(store.inventory().await, once);
    }
}
