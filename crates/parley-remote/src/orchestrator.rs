//! Distributed diarize-then-transcribe coordination.
//!
//! Two remote calls run in sequence. The diarization call is best effort:
//! any failure is logged and the job continues without speaker segments. The
//! transcription call is mandatory and its output is returned verbatim.

use std::time::Duration;

use parley_core::{DiarizationResult, JobError, SpeakerSegment, Stage};
use parley_settings::{OrchestratorSettings, SettingsError};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::endpoint::{EndpointClient, EndpointError};

/// Validated endpoint configuration, fixed for the process lifetime.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// `runsync` URL of the diarization endpoint.
    pub diarization_url: String,
    /// `runsync` URL of the transcription endpoint.
    pub transcription_url: String,
    /// Bearer token for both endpoints.
    pub api_key: String,
    /// Timeout for the diarization call.
    pub diarization_timeout: Duration,
    /// Timeout for the transcription call.
    pub transcription_timeout: Duration,
}

impl OrchestratorConfig {
    /// Build the configuration, failing when an endpoint id or the API key
    /// is missing.
    pub fn from_settings(settings: &OrchestratorSettings) -> Result<Self, SettingsError> {
        let required = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| SettingsError::Missing(name.to_string()))
        };
        let diarization_id = required(&settings.diarization_endpoint_id, "DIARIZATION_ENDPOINT_ID")?;
        let transcription_id =
            required(&settings.transcription_endpoint_id, "TRANSCRIPTION_ENDPOINT_ID")?;
        let api_key = required(&settings.api_key, "RUNPOD_API_KEY")?;

        let base = settings.base_url.trim_end_matches('/');
        Ok(Self {
            diarization_url: format!("{base}/{diarization_id}/runsync"),
            transcription_url: format!("{base}/{transcription_id}/runsync"),
            api_key,
            diarization_timeout: Duration::from_secs(settings.diarization_timeout_secs),
            transcription_timeout: Duration::from_secs(settings.transcription_timeout_secs),
        })
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    "json".to_string()
}

/// Job input accepted by the orchestrator.
#[derive(Clone, Debug, Deserialize)]
pub struct OrchestratorInput {
    /// URL or base64 audio, forwarded as-is.
    pub audio: Option<String>,
    /// Container format for base64 audio.
    pub audio_format: Option<String>,
    /// Run the diarization step.
    #[serde(default = "default_true")]
    pub diarize: bool,
    /// Expected number of speakers.
    pub num_speakers: Option<u32>,
    /// Language hint.
    pub language: Option<String>,
    /// Output format, validated by the transcription worker.
    #[serde(default = "default_format")]
    pub response_format: String,
    /// Include segments in `json` output.
    #[serde(default)]
    pub timestamps: bool,
    /// Ask for word-level timing.
    #[serde(default)]
    pub word_timestamps: bool,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
}

#[derive(Deserialize)]
struct DiarizationOutput {
    #[serde(default)]
    segments: Vec<SpeakerSegment>,
}

/// Coordinates the remote diarization and transcription endpoints.
#[derive(Debug)]
pub struct Orchestrator {
    diarization: EndpointClient,
    transcription: EndpointClient,
    diarization_timeout: Duration,
    transcription_timeout: Duration,
}

impl Orchestrator {
    /// Create an orchestrator from validated configuration.
    pub fn new(http: &reqwest::Client, config: &OrchestratorConfig) -> Self {
        Self {
            diarization: EndpointClient::new(
                http.clone(),
                "diarization",
                &config.diarization_url,
                &config.api_key,
            ),
            transcription: EndpointClient::new(
                http.clone(),
                "transcription",
                &config.transcription_url,
                &config.api_key,
            ),
            diarization_timeout: config.diarization_timeout,
            transcription_timeout: config.transcription_timeout,
        }
    }

    /// Run one job: diarize (best effort), then transcribe.
    pub async fn run(&self, input: OrchestratorInput) -> Result<Value, JobError> {
        let span = info_span!("orchestrated_job", job_id = %Uuid::now_v7(), diarize = input.diarize);
        self.run_inner(input).instrument(span).await
    }

    async fn run_inner(&self, input: OrchestratorInput) -> Result<Value, JobError> {
        let audio = input
            .audio
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| JobError::input("No audio input provided"))?;

        let diarization = if input.diarize {
            self.diarize(audio, &input).await
        } else {
            None
        };

        let mut payload = json!({
            "audio": audio,
            "audio_format": input.audio_format,
            "language": input.language,
            "response_format": input.response_format,
            "timestamps": input.timestamps || input.diarize,
            "word_timestamps": input.word_timestamps,
            "temperature": input.temperature,
            "diarize": false,
        });
        if let Some(diarization) = &diarization {
            payload["diarization_segments"] = json!(diarization.segments);
        }

        let output = self
            .transcription
            .call(payload, self.transcription_timeout)
            .await
            .map_err(|e| transcription_error(&e))?;

        info!(
            speakers = diarization.as_ref().map_or(0, |d| d.num_speakers),
            "orchestrated job complete"
        );
        Ok(output)
    }

    async fn diarize(&self, audio: &str, input: &OrchestratorInput) -> Option<DiarizationResult> {
        let payload = json!({
            "audio": audio,
            "audio_format": input.audio_format,
            "num_speakers": input.num_speakers,
        });

        let output = match self.diarization.call(payload, self.diarization_timeout).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "diarization endpoint failed, continuing without speakers");
                return None;
            }
        };

        match serde_json::from_value::<DiarizationOutput>(output) {
            Ok(parsed) if parsed.segments.is_empty() => {
                info!("diarization found no speakers");
                None
            }
            Ok(parsed) => {
                let result = DiarizationResult::from_segments(parsed.segments);
                info!(speakers = result.num_speakers, "diarization complete");
                Some(result)
            }
            Err(e) => {
                warn!(error = %e, "unreadable diarization output, continuing without speakers");
                None
            }
        }
    }
}

/// A parley worker already reports `Transcription failed: ...`; keep one prefix.
fn transcription_error(err: &EndpointError) -> JobError {
    let message = err.to_string();
    let prefix = format!("{} failed: ", Stage::Transcription);
    let message = message.strip_prefix(&prefix).unwrap_or(&message);
    JobError::stage(Stage::Transcription, message)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
