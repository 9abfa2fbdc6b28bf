//! Transaction inspection endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::TransactionId;
use coordinator::{TransactionInfo, TransactionState};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub state: TransactionState,
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub timeout_secs: u64,
    pub deadline: DateTime<Utc>,
}

impl From<TransactionInfo> for TransactionResponse {
    fn from(info: TransactionInfo) -> Self {
        Self {
            deadline: info.deadline(),
            timeout_secs: info.timeout.as_secs(),
            id: info.id,
            state: info.state,
            participants: info.participants,
            created_at: info.created_at,
        }
    }
}

/// GET /transactions/{id} — returns the coordinator's view of a transaction.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let info = state
        .orders
        .coordinator()
        .transaction(&TransactionId::from(id))
        .await?;
    Ok(Json(info.into()))
}
