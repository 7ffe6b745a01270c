//! Shared application state.

use std::sync::Arc;

use invest_common::ModelRegistry;

use crate::shutdown::ShutdownHandle;

/// Shared application state passed to all handlers.
pub struct AppState {
    /// Built once at startup, never mutated.
    pub registry: Arc<ModelRegistry>,
    /// Absent when the router is not served with graceful shutdown.
    pub shutdown: Option<ShutdownHandle>,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}
