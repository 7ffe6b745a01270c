//! HTTP routes used by the workbench front end.

pub mod datastack;
pub mod health;
pub mod models;
pub mod validate;
pub mod vector;

use std::sync::Arc;

use axum::Router;
use invest_common::Args;

use crate::error::{Error, Result};
use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(models::router())
        .merge(validate::router())
        .merge(vector::router())
        .merge(datastack::router())
}

/// Run filesystem-bound work on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Blocking task failed: {}", e)))?
}

/// Parse the JSON-encoded `args` field carried by several payloads.
pub(crate) fn parse_args(raw: &str) -> Result<Args> {
    serde_json::from_str(raw)
        .map_err(|e| Error::InvalidRequest(format!("args must be a JSON object: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = parse_args(r#"{"workspace_dir": "ws", "n_workers": -1}"#).unwrap();
        assert_eq!(args["workspace_dir"], "ws");
        assert!(matches!(parse_args("[1, 2]"), Err(Error::InvalidRequest(_))));
        assert!(matches!(parse_args("not json"), Err(Error::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_blocking_propagates_errors() {
        let ok = blocking(|| Ok(7)).await.unwrap();
        assert_eq!(ok, 7);
        let err = blocking::<(), _>(|| Err(Error::Internal("boom".into()))).await;
        assert!(matches!(err, Err(Error::Internal(_))));
    }
}
