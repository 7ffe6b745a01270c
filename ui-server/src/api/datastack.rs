//! Datastack and script endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Local;
use invest_common::{datastack, script, Args, DatastackType};
use serde::{Deserialize, Serialize};

use super::{blocking, parse_args};
use crate::error::{Error, Result};
use crate::state::AppState;

pub const PARAMETER_SET_SAVED: &str = "parameter set saved";
pub const SCRIPT_SAVED: &str = "python script saved";

/// Build the datastack router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/post_datastack_file", post(post_datastack_file))
        .route("/write_parameter_set_file", post(write_parameter_set_file))
        .route("/save_to_python", post(save_to_python))
}

/// Parsed datastack joined with the model's registry names.
#[derive(Debug, Serialize, Deserialize)]
pub struct DatastackInfoResponse {
    #[serde(rename = "type")]
    pub datastack_type: DatastackType,
    pub args: Args,
    pub module_name: String,
    pub model_run_name: String,
    pub model_human_name: String,
    pub invest_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteParameterSetRequest {
    pub parameter_set_path: String,
    /// Module name, e.g. `natcap.invest.carbon`.
    pub module_name: String,
    /// JSON-encoded args object.
    pub args: String,
    pub relative_paths: bool,
}

#[derive(Debug, Deserialize)]
pub struct SaveToPythonRequest {
    pub filepath: String,
    /// Run name, e.g. `carbon`.
    pub modelname: String,
    /// Module name, e.g. `natcap.invest.carbon`.
    pub pyname: String,
    /// JSON-encoded args object.
    pub args: String,
}

/// POST /post_datastack_file - Read args from a parameter set, archive or logfile.
///
/// Body is a JSON string with the file path.
async fn post_datastack_file(
    State(state): State<Arc<AppState>>,
    Json(filepath): Json<String>,
) -> Result<Json<DatastackInfoResponse>> {
    let path = PathBuf::from(filepath);
    let (datastack_type, info) = blocking(move || Ok(datastack::get_datastack_info(&path)?)).await?;

    let model = state
        .registry
        .by_module(&info.model_name)
        .ok_or_else(|| Error::ModelNotFound(info.model_name.clone()))?;

    let response = DatastackInfoResponse {
        datastack_type,
        args: info.args,
        module_name: info.model_name,
        model_run_name: model.run_name.clone(),
        model_human_name: model.human_name.clone(),
        invest_version: info.invest_version,
    };
    tracing::debug!(?response, "datastack info");
    Ok(Json(response))
}

/// POST /write_parameter_set_file - Save args as a parameter set.
async fn write_parameter_set_file(
    Json(request): Json<WriteParameterSetRequest>,
) -> Result<&'static str> {
    let args = parse_args(&request.args)?;
    blocking(move || {
        datastack::build_parameter_set(
            &args,
            &request.module_name,
            &PathBuf::from(&request.parameter_set_path),
            request.relative_paths,
        )?;
        Ok(())
    })
    .await?;
    Ok(PARAMETER_SET_SAVED)
}

/// POST /save_to_python - Write a script that runs the model with args.
async fn save_to_python(Json(request): Json<SaveToPythonRequest>) -> Result<&'static str> {
    let args = parse_args(&request.args)?;
    let generated_at = Local::now();
    blocking(move || {
        script::save_to_python(
            &PathBuf::from(&request.filepath),
            &request.modelname,
            &request.pyname,
            &args,
            &generated_at,
        )?;
        Ok(())
    })
    .await?;
    Ok(SCRIPT_SAVED)
}
