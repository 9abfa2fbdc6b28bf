//! Order placement and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::TransactionId;
use orders::{Order, OrderStatus};
use serde::{Deserialize, Serialize};
use services::ItemQuantities;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub items: ItemQuantities,
    pub location: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: TransactionId,
    pub items: ItemQuantities,
    pub location: String,
    pub status: OrderStatus,
    pub total_units: u64,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            total_units: order.total_units(),
            id: order.id,
            items: order.items,
            location: order.location,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

// -- Handlers --

/// POST /orders — places an order as a single transaction.
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;
    let location = req.location.trim();
    if location.is_empty() {
        return Err(ApiError::BadRequest("location must not be empty".to_string()));
    }

    let order = state.orders.place_order(req.items, location).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — lists orders, newest first.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<OrderResponse>> {
    let orders = state.orders.list_orders().await;
    Json(orders.into_iter().map(OrderResponse::from).collect())
}

/// GET /orders/{id} — returns a single order.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.get_order(&TransactionId::from(id)).await?;
    Ok(Json(order.into()))
}
