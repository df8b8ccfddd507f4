//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::config::Role;
use crate::handlers::ModelStatus;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Job surface this process exposes.
    pub role: Role,
    /// Whether the role's model is ready for jobs.
    pub model_loaded: bool,
    /// Configured model identifier, if the role has one.
    pub model_id: Option<String>,
    /// Whether jobs can be diarized.
    pub diarization_available: bool,
    /// Accelerator device name.
    pub device: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Build a health response from the handler's live status.
pub fn health_check(start_time: Instant, role: Role, status: ModelStatus) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        role,
        model_loaded: status.model_loaded,
        model_id: status.model_id,
        diarization_available: status.diarization_available,
        device: status.device,
        uptime_secs: start_time.elapsed().as_secs(),
    }
}
