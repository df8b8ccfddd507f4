//! Model collaborators backed by local HTTP sidecars.
//!
//! The speech and diarization models run in separate model-server processes
//! on the same host. Audio is posted as multipart WAV. Sidecar protocol:
//!
//! | Collaborator | Call | Endpoint |
//! |---|---|---|
//! | recognizer | readiness probe | `GET {asr}/health` |
//! | recognizer | transcribe chunk | `POST {asr}/transcribe` |
//! | accelerator | clear cache | `POST {asr}/empty-cache` |
//! | diarizer | diarize asset | `POST {diar}/diarize` |
//! | diarizer | release model | `POST {diar}/release` |

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::types::normalize_speaker_label;
use parley_core::{
    Accelerator, AsrOptions, ChunkTranscript, CollaboratorError, DiarizationResult, Diarizer,
    SpeakerSegment, SpeechRecognizer,
};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

async fn audio_part(path: &Path) -> Result<Part, CollaboratorError> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio.wav")
        .to_string();
    Part::bytes(bytes)
        .file_name(name)
        .mime_str("audio/wav")
        .map_err(|e| CollaboratorError::Transport(format!("failed to create multipart: {e}")))
}

async fn send(
    request: reqwest::RequestBuilder,
    what: &str,
) -> Result<reqwest::Response, CollaboratorError> {
    let response = request
        .send()
        .await
        .map_err(|e| CollaboratorError::Transport(format!("{what} request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(CollaboratorError::Inference(format!(
            "{what} returned {status}: {body}"
        )));
    }
    Ok(response)
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Recognizer
// ─────────────────────────────────────────────────────────────────────────────

/// Speech recognizer served by the ASR sidecar.
#[derive(Clone, Debug)]
pub struct SidecarRecognizer {
    http: reqwest::Client,
    base_url: String,
    model_id: String,
    timeout: Duration,
}

impl SidecarRecognizer {
    /// Probe the sidecar and return a recognizer once it answers healthy.
    pub async fn connect(
        http: reqwest::Client,
        base_url: &str,
        model_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let base_url = trim_base(base_url);
        let _ = send(
            http.get(format!("{base_url}/health"))
                .timeout(Duration::from_secs(10)),
            "ASR sidecar health",
        )
        .await?;
        Ok(Self {
            http,
            base_url,
            model_id: model_id.into(),
            timeout,
        })
    }
}

#[async_trait]
impl SpeechRecognizer for SidecarRecognizer {
    async fn transcribe(
        &self,
        chunk: &Path,
        options: &AsrOptions,
    ) -> Result<ChunkTranscript, CollaboratorError> {
        let mut form = Form::new()
            .part("audio", audio_part(chunk).await?)
            .text("word_timestamps", options.word_timestamps.to_string())
            .text("temperature", options.temperature.to_string());
        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }

        let response = send(
            self.http
                .post(format!("{}/transcribe", self.base_url))
                .timeout(self.timeout)
                .multipart(form),
            "ASR sidecar",
        )
        .await?;

        let transcript: ChunkTranscript = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(format!("transcription response: {e}")))?;
        debug!(segments = transcript.segments.len(), "chunk transcribed");
        Ok(transcript)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Diarizer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawDiarization {
    #[serde(default)]
    segments: Vec<SpeakerSegment>,
}

/// Speaker diarizer served by the diarization sidecar.
#[derive(Clone, Debug)]
pub struct SidecarDiarizer {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    timeout: Duration,
}

impl SidecarDiarizer {
    /// Create a diarizer. `access_token` is forwarded so the sidecar can
    /// fetch gated model weights.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
            access_token: access_token.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Diarizer for SidecarDiarizer {
    async fn diarize(
        &self,
        audio: &Path,
        num_speakers: Option<u32>,
    ) -> Result<DiarizationResult, CollaboratorError> {
        let mut form = Form::new().part("audio", audio_part(audio).await?);
        if let Some(n) = num_speakers {
            form = form.text("num_speakers", n.to_string());
        }

        let response = send(
            self.http
                .post(format!("{}/diarize", self.base_url))
                .bearer_auth(&self.access_token)
                .timeout(self.timeout)
                .multipart(form),
            "diarization sidecar",
        )
        .await?;

        let raw: RawDiarization = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(format!("diarization response: {e}")))?;

        let segments = raw
            .segments
            .into_iter()
            .map(|s| SpeakerSegment::new(s.start, s.end, normalize_speaker_label(&s.speaker)))
            .collect();
        Ok(DiarizationResult::from_segments(segments))
    }

    async fn release(&self) -> Result<(), CollaboratorError> {
        let _ = send(
            self.http
                .post(format!("{}/release", self.base_url))
                .bearer_auth(&self.access_token)
                .timeout(Duration::from_secs(60)),
            "diarization release",
        )
        .await?;
        debug!("diarization model released");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accelerator
// ─────────────────────────────────────────────────────────────────────────────

/// Accelerator owned by the ASR sidecar process.
#[derive(Clone, Debug)]
pub struct SidecarAccelerator {
    http: reqwest::Client,
    base_url: String,
    device: String,
}

impl SidecarAccelerator {
    /// Create a handle for the sidecar's `device`.
    pub fn new(http: reqwest::Client, base_url: &str, device: impl Into<String>) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
            device: device.into(),
        }
    }
}

#[async_trait]
impl Accelerator for SidecarAccelerator {
    fn device(&self) -> &str {
        &self.device
    }

    async fn empty_cache(&self) -> Result<(), CollaboratorError> {
        let _ = send(
            self.http
                .post(format!("{}/empty-cache", self.base_url))
                .timeout(Duration::from_secs(30)),
            "accelerator cache clear",
        )
        .await?;
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn wav_file(dir: &Path) -> std::path::PathBuf {
        let p = dir.join("chunk_0000.wav");
        std::fs::write(&p, b"RIFF....WAVE").unwrap();
        p
    }

    #[tokio::test]
    async fn recognizer_connects_and_transcribes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "text": "hello",
                "segments": [{"id": 0, "start": 0.0, "end": 1.0, "text": "hello"}]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let asr = SidecarRecognizer::connect(reqwest::Client::new(), &server.uri(), "m", TIMEOUT)
            .await
            .unwrap();
        let out = asr
            .transcribe(&wav_file(dir.path()), &AsrOptions::default())
            .await
            .unwrap();

        assert_eq!(out.text, "hello");
        assert_eq!(out.segments.len(), 1);
        assert!(out.segments[0].speaker.is_none());
        assert_eq!(asr.model_id(), "m");
    }

    #[tokio::test]
    async fn recognizer_connect_fails_when_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
            .mount(&server)
            .await;

        let err = SidecarRecognizer::connect(reqwest::Client::new(), &server.uri(), "m", TIMEOUT)
            .await
            .unwrap_err();
        assert_matches!(err, CollaboratorError::Inference(ref m) if m.contains("loading"));
    }

    #[tokio::test]
    async fn recognizer_error_status_is_inference_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let asr = SidecarRecognizer::connect(reqwest::Client::new(), &server.uri(), "m", TIMEOUT)
            .await
            .unwrap();
        let err = asr
            .transcribe(&wav_file(dir.path()), &AsrOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, CollaboratorError::Inference(ref m) if m.contains("CUDA"));
    }

    #[tokio::test]
    async fn diarizer_normalizes_labels_and_sorts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/diarize"))
            .and(header("authorization", "Bearer hf_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "segments": [
                    {"start": 3.0, "end": 5.0, "speaker": "SPEAKER_01"},
                    {"start": 0.0, "end": 3.0, "speaker": "SPEAKER_00"}
                ]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let diarizer =
            SidecarDiarizer::new(reqwest::Client::new(), &server.uri(), "hf_token", TIMEOUT);
        let result = diarizer.diarize(&wav_file(dir.path()), Some(2)).await.unwrap();

        assert_eq!(result.num_speakers, 2);
        assert_eq!(result.segments[0].speaker, "1");
        assert_eq!(result.segments[1].speaker, "2");
    }

    #[tokio::test]
    async fn diarizer_release_posts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/release"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let diarizer = SidecarDiarizer::new(reqwest::Client::new(), &server.uri(), "t", TIMEOUT);
        diarizer.release().await.unwrap();
    }

    #[tokio::test]
    async fn accelerator_clears_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/empty-cache"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/", server.uri());
        let acc = SidecarAccelerator::new(reqwest::Client::new(), &base, "cuda:0");
        assert_eq!(acc.device(), "cuda:0");
        acc.empty_cache().await.unwrap();
    }

    #[tokio::test]
    async fn missing_chunk_file_is_io_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let asr = SidecarRecognizer::connect(reqwest::Client::new(), &server.uri(), "m", TIMEOUT)
            .await
            .unwrap();
        let err = asr
            .transcribe(Path::new("/nonexistent/chunk.wav"), &AsrOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, CollaboratorError::Io(_));
    }
}
