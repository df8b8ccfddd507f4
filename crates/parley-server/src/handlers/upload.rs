//! OpenAI-compatible routes: `POST /v1/audio/transcriptions` and
//! `GET /v1/models`.

use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use parley_audio::AudioSource;
use parley_core::JobError;
use parley_pipeline::{LocalJobRunner, RenderedOutput, ResponseFormat, TranscriptionRequest};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::errors::ApiError;

/// The one model id advertised for client compatibility.
pub const COMPAT_MODEL_ID: &str = "whisper-1";
const COMPAT_MODEL_CREATED: i64 = 1_677_649_963;

fn parse_bool(name: &str, value: &str) -> Result<bool, JobError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(JobError::input(format!("Invalid boolean for {name}: {other}"))),
    }
}

async fn field_text(field: Field<'_>, name: &str) -> Result<String, JobError> {
    field
        .text()
        .await
        .map_err(|e| JobError::input(format!("Invalid form field {name}: {e}")))
}

/// Collect the multipart form into a request. Unknown fields are ignored.
async fn read_form(mut multipart: Multipart) -> Result<TranscriptionRequest, JobError> {
    let mut file: Option<(Vec<u8>, Option<String>)> = None;
    let mut response_format = ResponseFormat::Json;
    let mut language = None;
    let mut temperature = 0.0_f32;
    let mut timestamps = false;
    let mut word_timestamps = false;
    let mut diarize = true;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| JobError::input(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| JobError::input(format!("Failed to read upload: {e}")))?;
                file = Some((bytes.to_vec(), filename));
            }
            "response_format" => {
                response_format = field_text(field, &name).await?.parse()?;
            }
            "language" => {
                language = Some(field_text(field, &name).await?).filter(|l| !l.trim().is_empty());
            }
            "temperature" => {
                let raw = field_text(field, &name).await?;
                temperature = raw
                    .trim()
                    .parse()
                    .map_err(|_| JobError::input(format!("Invalid temperature: {raw}")))?;
            }
            "timestamps" => timestamps = parse_bool(&name, &field_text(field, &name).await?)?,
            "word_timestamps" => {
                word_timestamps = parse_bool(&name, &field_text(field, &name).await?)?;
            }
            "diarize" => diarize = parse_bool(&name, &field_text(field, &name).await?)?,
            "timestamp_granularities" | "timestamp_granularities[]" => {
                match field_text(field, &name).await?.trim() {
                    "segment" => timestamps = true,
                    "word" => word_timestamps = true,
                    _ => {}
                }
            }
            other => debug!(field = other, "ignoring form field"),
        }
    }

    let (bytes, filename) = file.ok_or_else(|| JobError::input("No audio file provided"))?;
    info!(filename = ?filename, format = response_format.as_str(), "transcription requested");

    let mut request = TranscriptionRequest::new(AudioSource::Upload { bytes, filename });
    request.response_format = response_format;
    request.language = language;
    request.temperature = temperature;
    request.timestamps = timestamps;
    request.word_timestamps = word_timestamps;
    request.diarize = diarize;
    Ok(request)
}

/// `POST /v1/audio/transcriptions`
pub async fn transcribe_upload(
    State(runner): State<Arc<LocalJobRunner>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let multipart = multipart.map_err(|e| {
        JobError::input(format!("Expected a multipart form: {}", e.body_text()))
    })?;
    let request = read_form(multipart).await?;

    Ok(match runner.run(request).await? {
        RenderedOutput::Json(body) => Json(body).into_response(),
        RenderedOutput::Text(text) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response(),
    })
}

/// `GET /v1/models`
pub async fn list_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{
            "id": COMPAT_MODEL_ID,
            "object": "model",
            "created": COMPAT_MODEL_CREATED,
            "owned_by": "parakeet",
            "root": COMPAT_MODEL_ID,
        }]
    }))
}
