//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub participants: Vec<String>,
    pub transactions: usize,
}

/// GET /health — reports the registered participants and transaction count.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let coordinator = state.orders.coordinator();
    Json(HealthResponse {
        status: "ok",
        participants: coordinator.participant_names().await,
        transactions: coordinator.transaction_count().await,
    })
}
