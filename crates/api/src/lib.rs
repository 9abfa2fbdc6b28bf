//! HTTP API server for the order fulfillment coordinator.
//!
//! Exposes order placement, transaction inspection, and store and delivery
//! administration over REST, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use coordinator::Coordinator;
use metrics_exporter_prometheus::PrometheusHandle;
use orders::OrderService;
use services::{Delivery, Store};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orders: OrderService,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create).get(routes::orders::list),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .route("/transactions/{id}", get(routes::transactions::get))
        .route(
            "/inventory",
            get(routes::inventory::list).post(routes::inventory::restock),
        )
        .route(
            "/agents",
            get(routes::agents::list).post(routes::agents::create),
        )
        .route("/agents/{id}/complete", post(routes::agents::complete))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the coordinator, store, and delivery service, seeded from config.
pub async fn create_state(config: &Config) -> Result<Arc<AppState>, ApiError> {
    let store = Arc::new(Store::new());
    for (item, quantity) in &config.seed_inventory {
        store.add_item(item.clone(), *quantity).await;
    }

    let delivery = Arc::new(Delivery::new());
    for (agent_id, location) in &config.seed_agents {
        delivery
            .add_agent(agent_id.clone(), location.as_str())
            .await?;
    }

    tracing::info!(
        items = config.seed_inventory.len(),
        agents = config.seed_agents.len(),
        "seeded store and delivery"
    );

    let orders = OrderService::new(Arc::new(Coordinator::new()), store, delivery)
        .await
        .with_timeout(config.transaction_timeout);

    Ok(Arc::new(AppState { orders }))
}

/// Registers descriptions for the metrics emitted by the coordinator,
/// participants, and order service.
pub fn describe_metrics() {
    metrics::describe_counter!("transactions_begun_total", "Transactions started");
    metrics::describe_counter!("transactions_committed_total", "Transactions committed");
    metrics::describe_counter!("transactions_aborted_total", "Transactions aborted");
    metrics::describe_counter!(
        "participant_failures_total",
        "Participant failures by participant and phase"
    );
    metrics::describe_counter!("store_units_reserved_total", "Item units reserved at prepare");
    metrics::describe_counter!("delivery_agents_assigned_total", "Agents assigned to orders");
    metrics::describe_counter!("order_placements_total", "Order placement attempts");
    metrics::describe_counter!("orders_placed_total", "Orders confirmed");
    metrics::describe_counter!("orders_failed_total", "Orders that failed and were aborted");
    metrics::describe_counter!("compensation_failures_total", "Compensating aborts that failed");
    metrics::describe_counter!(
        "commit_participant_failures_total",
        "Participant failures after the commit decision"
    );
    metrics::describe_histogram!(
        "order_placement_duration_seconds",
        metrics::Unit::Seconds,
        "Time to place an order"
    );
}
