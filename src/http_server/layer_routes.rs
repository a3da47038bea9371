//! Layer HTTP Routes

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use super::errors::ApiResult;
use crate::layer::{Layer, LayerManager};

/// Create layer routes
pub fn layer_routes(manager: Arc<LayerManager>) -> Router {
    Router::new()
        .route("/layer", get(get_layers_handler))
        .with_state(manager)
}

async fn get_layers_handler(
    State(manager): State<Arc<LayerManager>>,
) -> ApiResult<Json<Vec<Layer>>> {
    Ok(Json(manager.get_all_layers().await?))
}
