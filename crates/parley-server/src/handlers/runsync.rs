//! `POST /runsync`: the serverless job envelope.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use parley_core::JobError;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::errors::job_failure;
use crate::server::AppState;

/// Unwrap `{"input": ...}`, run the role's job, and wrap the result.
pub async fn runsync(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let input = match body {
        Ok(Json(mut body)) => match body.get_mut("input").map(Value::take) {
            Some(input) if !input.is_null() => input,
            _ => return job_failure(&JobError::input("Missing 'input' in request body")),
        },
        Err(rejection) => {
            return job_failure(&JobError::input(format!(
                "Invalid request body: {}",
                rejection.body_text()
            )));
        }
    };

    match state.handler.handle(input).await {
        Ok(output) => {
            info!(role = %state.role, "job completed");
            Json(json!({"status": "COMPLETED", "output": output})).into_response()
        }
        Err(err) => {
            warn!(role = %state.role, code = err.code(), error = %err, "job failed");
            job_failure(&err)
        }
    }
}
