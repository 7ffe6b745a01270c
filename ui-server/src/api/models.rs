//! Model listing and args spec endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use invest_common::ModelListing;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::state::AppState;

/// Build the models router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/models", get(list_models))
        .route("/getspec", post(get_spec))
}

/// GET /models - Human name -> run name and aliases for every model.
async fn list_models(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, ModelListing>> {
    tracing::debug!("get model list");
    Json(state.registry.model_list())
}

/// POST /getspec - Args spec of a model.
///
/// Body is a JSON string with the model's run name, e.g. `"carbon"`.
async fn get_spec(
    State(state): State<Arc<AppState>>,
    Json(model): Json<String>,
) -> Result<Json<Value>> {
    let entry = state
        .registry
        .get(&model)
        .ok_or_else(|| Error::ModelNotFound(model.clone()))?;

    tracing::debug!("Serving args spec of {}", entry.module_name);
    Ok(Json(entry.raw_spec().clone()))
}
