use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::error::ApiError;
use crate::runner::Runner;
use vigil_types::Status;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<Runner>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// 每个请求触发一次完整评估周期
async fn status_handler(State(state): State<AppState>) -> Result<Json<Status>, ApiError> {
    let status = state.runner.check().await.map_err(|e| {
        error!("Status check failed: {:#}", e);
        ApiError::from(e)
    })?;

    Ok(Json(status))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "OK"}))
}
