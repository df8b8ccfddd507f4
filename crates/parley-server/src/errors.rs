//! HTTP renderings of [`JobError`].
//!
//! The upload route answers with an OpenAI-style `{"error": {...}}` body; the
//! serverless route answers with a `FAILED` envelope. Both take their status
//! code from the error taxonomy.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::JobError;
use serde_json::json;

/// Error returned by the upload routes.
#[derive(Debug)]
pub struct ApiError(pub JobError);

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        Self(err)
    }
}

fn status_of(err: &JobError) -> StatusCode {
    StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.0.code(),
                "message": self.0.to_string(),
            }
        });
        (status_of(&self.0), Json(body)).into_response()
    }
}

/// `FAILED` envelope for a serverless job.
pub fn job_failure(err: &JobError) -> Response {
    let body = json!({
        "status": "FAILED",
        "error": err.to_string(),
        "code": err.code(),
        "retryable": err.is_retryable(),
    });
    (status_of(err), Json(body)).into_response()
}
