//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_path: String,
    pub version: &'static str,
    pub history_enabled: bool,
    pub stage_workers_in_flight: usize,
}

/// `GET /api/v1/health`: liveness plus classifier state.
///
/// Reports `"degraded"` when the classifier did not load; every classification
/// will fail until the service restarts with valid weights.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let model_loaded = ctx.pipeline.classifier_loaded();

    Json(HealthResponse {
        status: if model_loaded { "ok" } else { "degraded" },
        model_loaded,
        model_path: ctx.settings.resolved_model_path().display().to_string(),
        version: crate::config::APP_VERSION,
        history_enabled: ctx.history.is_some(),
        stage_workers_in_flight: ctx.pipeline.stage_workers_in_flight(),
    })
}
