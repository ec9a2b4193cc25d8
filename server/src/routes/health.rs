//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use tomato_leaf::backend::backend_name;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub version: String,
    pub backend: String,
    pub num_classes: usize,
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.uptime_seconds(),
        started_at: state.started_at_utc.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: backend_name().to_string(),
        num_classes: state.pipeline.num_classes(),
    })
}
