//! Vector probing endpoints.
//!
//! The workbench calls these while the user is still typing a path, so bad
//! paths are expected: failures are logged and answered with a default
//! instead of an error.

use std::path::Path;
use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use invest_common::vector;
use serde::{Deserialize, Serialize};

use super::blocking;
use crate::state::AppState;

/// Build the vector router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/colnames", post(colnames))
        .route("/vector_has_points", post(vector_has_points))
}

#[derive(Debug, Deserialize)]
pub struct VectorRequest {
    pub vector_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ColnamesResponse {
    pub colnames: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HasPointsResponse {
    pub has_points: bool,
}

/// POST /colnames - Attribute field names of a vector, or `[]`.
async fn colnames(Json(request): Json<VectorRequest>) -> Json<ColnamesResponse> {
    let vector_path = request.vector_path;
    let mut colnames = Vec::new();
    // Empty paths are common while a form is being filled in.
    if !vector_path.is_empty() {
        let path = vector_path.clone();
        match blocking(move || Ok(vector::column_names(Path::new(&path))?)).await {
            Ok(names) => colnames = names,
            Err(e) => {
                tracing::error!("Could not read column names from {}: {}", vector_path, e)
            }
        }
    }
    tracing::debug!(?colnames, "colnames");
    Json(ColnamesResponse { colnames })
}

/// POST /vector_has_points - Whether a vector may hold point geometries.
///
/// Defaults to true: a vector may hold points unless proven otherwise.
async fn vector_has_points(Json(request): Json<VectorRequest>) -> Json<HasPointsResponse> {
    let vector_path = request.vector_path;
    let mut has_points = true;
    if !vector_path.is_empty() {
        let path = vector_path.clone();
        match blocking(move || Ok(vector::may_contain_points(Path::new(&path))?)).await {
            Ok(result) => has_points = result,
            Err(e) => tracing::error!(
                "Could not tell if vector {} contains points: {}",
                vector_path,
                e
            ),
        }
    }
    tracing::debug!(has_points = has_points, "vector_has_points");
    Json(HasPointsResponse { has_points })
}
