//! Client for serverless `runsync` endpoints.
//!
//! Requests are `{"input": ...}` with bearer auth. Responses carry either a
//! top-level `error` or an `output` object; the client unwraps `output` and
//! turns every failure shape into an [`EndpointError`].

use std::time::{Duration, Instant};

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

/// Failure of a remote endpoint call.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The call did not finish within its timeout.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Connection or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status without a readable error body.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The endpoint reported an error.
    #[error("{0}")]
    Remote(String),

    /// The response was not the expected JSON.
    #[error("invalid response: {0}")]
    Decode(String),
}

/// A single serverless endpoint.
#[derive(Clone, Debug)]
pub struct EndpointClient {
    http: reqwest::Client,
    name: &'static str,
    url: String,
    api_key: String,
}

impl EndpointClient {
    /// Create a client for `url`. `name` labels log lines.
    pub fn new(
        http: reqwest::Client,
        name: &'static str,
        url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            name,
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Submit `input` and wait up to `timeout` for the output.
    pub async fn call(&self, input: Value, timeout: Duration) -> Result<Value, EndpointError> {
        let started = Instant::now();
        debug!(endpoint = self.name, url = %self.url, "calling endpoint");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| classify(&e, timeout))?;

        let body: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) if !status.is_success() => {
                return Err(EndpointError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }
            Err(e) => return Err(EndpointError::Decode(e.to_string())),
        };

        if let Some(message) = error_field(&body) {
            return Err(EndpointError::Remote(message));
        }
        if !status.is_success() {
            return Err(EndpointError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let output = unwrap_output(body);
        if let Some(message) = error_field(&output) {
            return Err(EndpointError::Remote(message));
        }

        info!(
            endpoint = self.name,
            elapsed_ms = started.elapsed().as_millis(),
            "endpoint call complete"
        );
        Ok(output)
    }
}

fn classify(err: &reqwest::Error, timeout: Duration) -> EndpointError {
    if err.is_timeout() {
        EndpointError::Timeout(timeout)
    } else {
        EndpointError::Transport(err.to_string())
    }
}

fn error_field(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn unwrap_output(mut body: Value) -> Value {
    match body.as_object_mut().and_then(|o| o.remove("output")) {
        Some(output) => output,
        None => body,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
