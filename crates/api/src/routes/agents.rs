//! Delivery agent endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AgentId, TransactionId};
use coordinator::ParticipantError;
use serde::{Deserialize, Serialize};
use services::DeliveryAgent;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AddAgentRequest {
    pub id: String,
    pub location: String,
}

#[derive(Serialize)]
pub struct AgentResponse {
    pub id: AgentId,
    pub location: String,
    pub available: bool,
    pub assigned_to: Option<TransactionId>,
}

impl From<DeliveryAgent> for AgentResponse {
    fn from(agent: DeliveryAgent) -> Self {
        Self {
            id: agent.id,
            location: agent.location,
            available: agent.available,
            assigned_to: agent.assigned_to,
        }
    }
}

/// GET /agents — every agent, ordered by ID.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<AgentResponse>> {
    let agents = state.orders.delivery().agents().await;
    Json(agents.into_iter().map(AgentResponse::from).collect())
}

/// POST /agents — registers a new available agent.
#[tracing::instrument(skip_all, fields(agent_id = tracing::field::Empty))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddAgentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AgentResponse>), ApiError> {
    let Json(req) = payload?;
    tracing::Span::current().record("agent_id", req.id.as_str());

    let (id, location) = (req.id.trim(), req.location.trim());
    if id.is_empty() || location.is_empty() {
        return Err(ApiError::BadRequest(
            "agent id and location must not be empty".to_string(),
        ));
    }

    let delivery = state.orders.delivery();
    let agent_id = AgentId::from(id);
    delivery.add_agent(agent_id.clone(), location).await?;
    let agent = delivery
        .agent(&agent_id)
        .await
        .ok_or(ParticipantError::AgentNotFound(agent_id))?;
    Ok((StatusCode::CREATED, Json(agent.into())))
}

/// POST /agents/{id}/complete — marks a delivery finished and frees the agent.
#[tracing::instrument(skip_all, fields(agent_id = %id))]
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AgentResponse>, ApiError> {
    let delivery = state.orders.delivery();
    let agent_id = AgentId::from(id);
    delivery.complete_delivery(&agent_id).await?;
    let agent = delivery
        .agent(&agent_id)
        .await
        .ok_or(ParticipantError::AgentNotFound(agent_id))?;
    Ok(Json(agent.into()))
}
