//! Store inventory endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use common::ItemId;
use serde::Deserialize;
use services::ItemQuantities;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RestockRequest {
    pub item: String,
    pub quantity: u32,
}

/// GET /inventory — current available quantity per item.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<ItemQuantities> {
    Json(state.orders.store().inventory().await)
}

/// POST /inventory — adds stock for an item and returns the new inventory.
#[tracing::instrument(
    skip_all,
    fields(item = tracing::field::Empty, quantity = tracing::field::Empty)
)]
pub async fn restock(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RestockRequest>, JsonRejection>,
) -> Result<Json<ItemQuantities>, ApiError> {
    let Json(req) = payload?;
    let span = tracing::Span::current();
    span.record("item", req.item.as_str());
    span.record("quantity", req.quantity);

    let item = req.item.trim();
    if item.is_empty() {
        return Err(ApiError::BadRequest("item must not be empty".to_string()));
    }

    let store = state.orders.store();
    store.add_item(ItemId::from(item), req.quantity).await;
    Ok(Json(store.inventory().await))
}
