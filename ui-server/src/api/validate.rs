//! Argument validation endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use invest_common::ValidationWarning;
use serde::Deserialize;

use super::{blocking, parse_args};
use crate::error::{Error, Result};
use crate::state::AppState;

/// Build the validation router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/validate", post(validate))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// Module name, e.g. `natcap.invest.carbon`.
    pub model_module: String,
    /// JSON-encoded args object.
    pub args: String,
    #[serde(default)]
    pub limit_to: Option<String>,
}

/// POST /validate - Run a model's validation function over args.
async fn validate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<Vec<ValidationWarning>>> {
    tracing::debug!(?request, "validate");
    let args = parse_args(&request.args)?;

    let registry = state.registry.clone();
    let warnings = blocking(move || {
        let model = registry
            .by_module(&request.model_module)
            .ok_or_else(|| Error::ModelNotFound(request.model_module.clone()))?;
        Ok(model.validate(&args, request.limit_to.as_deref()))
    })
    .await?;

    tracing::debug!(?warnings, "validation result");
    Ok(Json(warnings))
}
