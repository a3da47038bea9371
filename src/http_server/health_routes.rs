//! Health HTTP Routes
//!
//! `/liveness` and `/readiness` share one check: 200 only when the store
//! responds within [`STORE_PING_TIMEOUT`].

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use super::errors::{ApiError, ApiResult};
use crate::log_event;
use crate::observability::Event;
use crate::store::HealthCheck;

/// How long the store gets to answer a ping
pub const STORE_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Create health routes
pub fn health_routes(health: Arc<dyn HealthCheck>) -> Router {
    Router::new()
        .route("/liveness", get(store_check_handler))
        .route("/readiness", get(store_check_handler))
        .with_state(health)
}

async fn store_check_handler(
    State(health): State<Arc<dyn HealthCheck>>,
) -> ApiResult<(StatusCode, Json<HealthResponse>)> {
    let reason = match tokio::time::timeout(STORE_PING_TIMEOUT, health.ping()).await {
        Ok(Ok(())) => {
            return Ok((
                StatusCode::OK,
                Json(HealthResponse {
                    status: "ok".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                }),
            ))
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("store did not answer within {:?}", STORE_PING_TIMEOUT),
    };

    log_event!(Event::StoreUnreachable, reason = %reason);
    Err(ApiError::Unavailable(reason))
}
