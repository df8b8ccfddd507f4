//! Where job audio comes from and how it lands on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

use crate::errors::AudioError;

/// Stem of the file a source is written to.
const INPUT_STEM: &str = "input_audio";

/// Audio payload submitted with a job.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioSource {
    /// Raw bytes from a multipart upload.
    Upload {
        /// File contents.
        bytes: Vec<u8>,
        /// Client-provided file name, used for the extension.
        filename: Option<String>,
    },
    /// An `http(s)` URL to download.
    Url(String),
    /// Base64 payload with its container format (e.g. `mp3`).
    Base64 {
        /// Encoded audio, optionally with a data-URL prefix.
        data: String,
        /// Container extension.
        format: String,
    },
}

impl AudioSource {
    /// Resolve the `audio` / `audio_format` fields of a JSON job input.
    ///
    /// URLs are recognised by scheme. Anything else is treated as base64 and
    /// requires `audio_format`.
    pub fn from_job_fields(audio: Option<&str>, format: Option<&str>) -> Result<Self, AudioError> {
        let audio = audio
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AudioError::InvalidInput("No audio input provided".into()))?;

        if audio.starts_with("http://") || audio.starts_with("https://") {
            return Ok(Self::Url(audio.to_string()));
        }

        let format = format
            .map(|f| f.trim().trim_start_matches('.'))
            .filter(|f| !f.is_empty())
            .ok_or_else(|| {
                AudioError::InvalidInput("audio_format is required for base64 audio input".into())
            })?;

        Ok(Self::Base64 {
            data: audio.to_string(),
            format: format.to_string(),
        })
    }

    /// Short description for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upload { .. } => "upload",
            Self::Url(_) => "url",
            Self::Base64 { .. } => "base64",
        }
    }

    /// Write the payload into `dir`, downloading URLs with `client`.
    pub async fn materialize(
        &self,
        dir: &Path,
        client: &reqwest::Client,
        download_timeout: Duration,
    ) -> Result<PathBuf, AudioError> {
        let (bytes, ext) = match self {
            Self::Upload { bytes, filename } => {
                let ext = filename
                    .as_deref()
                    .and_then(|f| Path::new(f).extension())
                    .and_then(|e| e.to_str())
                    .unwrap_or("bin")
                    .to_string();
                (bytes.clone(), ext)
            }
            Self::Url(url) => {
                let bytes = download(client, url, download_timeout).await?;
                (bytes, extension_from_url(url))
            }
            Self::Base64 { data, format } => {
                let bytes = STANDARD
                    .decode(normalize_base64(data))
                    .map_err(|e| AudioError::InvalidInput(format!("invalid base64 audio: {e}")))?;
                (bytes, format.clone())
            }
        };

        if bytes.is_empty() {
            return Err(AudioError::InvalidInput("audio payload is empty".into()));
        }

        let path = dir.join(format!("{INPUT_STEM}.{ext}"));
        tokio::fs::write(&path, &bytes).await?;
        debug!(source = self.kind(), bytes = bytes.len(), ?path, "materialized audio");
        Ok(path)
    }
}

/// Strip a data-URL prefix from base64 audio.
///
/// Everything up to and including the first comma is dropped
/// (`data:audio/m4a;base64,AAAA` becomes `AAAA`). Plain base64 passes through.
pub fn normalize_base64(input: &str) -> &str {
    match input.split_once(',') {
        Some((_, rest)) => rest.trim(),
        None => input.trim(),
    }
}

async fn download(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, AudioError> {
    info!(url, "downloading audio");
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AudioError::Download(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AudioError::Download(format!("{url} returned HTTP {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AudioError::Download(e.to_string()))?;
    Ok(bytes.to_vec())
}

fn extension_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 5)
        .unwrap_or("audio")
        .to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn url_detected_by_scheme() {
        let source = AudioSource::from_job_fields(Some("https://x.test/a.mp3"), None).unwrap();
        assert_eq!(source, AudioSource::Url("https://x.test/a.mp3".into()));
    }

    #[test]
    fn base64_requires_format() {
        let err = AudioSource::from_job_fields(Some("SGVsbG8="), None).unwrap_err();
        assert_matches!(err, AudioError::InvalidInput(ref m) if m.contains("audio_format"));
    }

    #[test]
    fn missing_audio_is_input_error() {
        assert_matches!(
            AudioSource::from_job_fields(None, Some("wav")),
            Err(AudioError::InvalidInput(_))
        );
        assert_matches!(
            AudioSource::from_job_fields(Some("  "), Some("wav")),
            Err(AudioError::InvalidInput(_))
        );
    }

    #[test]
    fn normalize_base64_strips_data_uri() {
        assert_eq!(normalize_base64("data:audio/m4a;base64,AAAA"), "AAAA");
        assert_eq!(normalize_base64("SGVsbG8="), "SGVsbG8=");
        assert_eq!(normalize_base64(""), "");
    }

    #[test]
    fn url_extension() {
        assert_eq!(extension_from_url("https://x.test/a/b.mp3?sig=1"), "mp3");
        assert_eq!(extension_from_url("https://x.test/stream"), "audio");
    }

    #[tokio::test]
    async fn base64_materializes_with_format_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = AudioSource::Base64 {
            data: "data:audio/wav;base64,SGVsbG8=".into(),
            format: "wav".into(),
        };
        let path = source
            .materialize(dir.path(), &reqwest::Client::new(), TIMEOUT)
            .await
            .unwrap();
        assert!(path.ends_with("input_audio.wav"));
        assert_eq!(std::fs::read(&path).unwrap(), b"Hello");
    }

    #[tokio::test]
    async fn invalid_base64_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = AudioSource::Base64 {
            data: "!!!not base64!!!".into(),
            format: "wav".into(),
        };
        let err = source
            .materialize(dir.path(), &reqwest::Client::new(), TIMEOUT)
            .await
            .unwrap_err();
        assert_matches!(err, AudioError::InvalidInput(_));
    }

    #[tokio::test]
    async fn upload_uses_filename_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = AudioSource::Upload {
            bytes: vec![1, 2, 3],
            filename: Some("meeting.m4a".into()),
        };
        let path = source
            .materialize(dir.path(), &reqwest::Client::new(), TIMEOUT)
            .await
            .unwrap();
        assert!(path.ends_with("input_audio.m4a"));
    }

    #[tokio::test]
    async fn url_download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/audio.wav"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8; 16]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let source = AudioSource::Url(format!("{}/audio.wav", server.uri()));
        let path = source
            .materialize(dir.path(), &reqwest::Client::new(), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 16);
        assert!(path.ends_with("input_audio.wav"));
    }

    #[tokio::test]
    async fn url_download_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let source = AudioSource::Url(format!("{}/missing.wav", server.uri()));
        let err = source
            .materialize(dir.path(), &reqwest::Client::new(), TIMEOUT)
            .await
            .unwrap_err();
        assert_matches!(err, AudioError::Download(ref m) if m.contains("404"));
    }
}
