//! Liveness and shutdown endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::error::{Error, Result};
use crate::state::AppState;

pub const READY_MESSAGE: &str = "Server ready";
pub const SHUTDOWN_MESSAGE: &str = "Server shutting down...";

/// Build the health router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ready", get(ready))
        .route("/shutdown", get(shutdown))
}

/// GET /ready - Confirms the server is accepting requests.
async fn ready() -> &'static str {
    READY_MESSAGE
}

/// GET /shutdown - Stops the server once in-flight requests finish.
async fn shutdown(State(state): State<Arc<AppState>>) -> Result<&'static str> {
    let handle = state.shutdown.as_ref().ok_or_else(|| {
        Error::ShutdownUnavailable(
            "not running with a server that supports graceful shutdown".to_string(),
        )
    })?;

    if !handle.trigger().await {
        return Err(Error::ShutdownUnavailable(
            "shutdown already in progress".to_string(),
        ));
    }

    tracing::info!("Shutdown requested");
    Ok(SHUTDOWN_MESSAGE)
}
