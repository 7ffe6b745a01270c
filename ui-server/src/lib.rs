//! InVEST UI server - local HTTP endpoints used by the workbench front end.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod shutdown;
pub mod state;

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::cors::CorsLayer;

pub use config::Config;
pub use shutdown::{ShutdownHandle, ShutdownSignal};
pub use state::AppState;

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::router())
        .layer(middleware::from_fn(logging::request_logger))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
