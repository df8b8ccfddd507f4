//! Settings sections.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleySettings {
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// Speech recognition and chunking settings.
    pub transcription: TranscriptionSettings,
    /// Speaker diarization settings.
    pub diarization: DiarizationSettings,
    /// Remote endpoint settings for the orchestrator role.
    pub orchestrator: OrchestratorSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 500 * 1024 * 1024,
        }
    }
}

/// Speech recognition and chunking settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionSettings {
    /// Model identifier reported by health checks.
    pub model_id: String,
    /// Short model name reported in `verbose_json` responses.
    pub model_name: String,
    /// Maximum chunk duration in seconds.
    pub chunk_duration_secs: u64,
    /// Base directory for per-job scratch directories.
    pub temp_dir: String,
    /// Base URL of the speech recognition sidecar.
    pub sidecar_url: String,
    /// Accelerator device the sidecars run on, reported by health checks.
    pub device: String,
    /// Timeout for a single chunk transcription call, in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for downloading URL inputs, in seconds.
    pub download_timeout_secs: u64,
    /// Delay between recognizer readiness probes at startup, in seconds.
    pub load_retry_secs: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model_id: "nvidia/parakeet-tdt-0.6b-v2".to_string(),
            model_name: "parakeet-tdt-0.6b-v2".to_string(),
            chunk_duration_secs: 300,
            temp_dir: std::env::temp_dir()
                .join("parley")
                .to_string_lossy()
                .into_owned(),
            sidecar_url: "http://127.0.0.1:8787".to_string(),
            device: "cuda".to_string(),
            request_timeout_secs: 600,
            download_timeout_secs: 300,
            load_retry_secs: 5,
        }
    }
}

impl TranscriptionSettings {
    /// Scratch directory as a path.
    pub fn temp_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.temp_dir)
    }
}

/// Speaker diarization settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiarizationSettings {
    /// Whether diarization may run at all.
    pub enabled: bool,
    /// Credential for the diarization model. Diarization is unavailable without it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Base URL of the diarization sidecar.
    pub sidecar_url: String,
    /// Timeout for a diarization call, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for DiarizationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            access_token: None,
            sidecar_url: "http://127.0.0.1:8788".to_string(),
            request_timeout_secs: 600,
        }
    }
}

impl DiarizationSettings {
    /// Whether diarization is enabled and a credential is configured.
    pub fn is_available(&self) -> bool {
        self.enabled && self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Remote endpoint settings for the orchestrator role.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorSettings {
    /// Base URL that endpoint ids are appended to.
    pub base_url: String,
    /// Diarization endpoint id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diarization_endpoint_id: Option<String>,
    /// Transcription endpoint id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription_endpoint_id: Option<String>,
    /// Bearer token for both endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Timeout for the diarization call, in seconds.
    pub diarization_timeout_secs: u64,
    /// Timeout for the transcription call, in seconds.
    pub transcription_timeout_secs: u64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.runpod.ai/v2".to_string(),
            diarization_endpoint_id: None,
            transcription_endpoint_id: None,
            api_key: None,
            diarization_timeout_secs: 600,
            transcription_timeout_secs: 900,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit one JSON object per line instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = ParleySettings::default();
        assert_eq!(s.server.port, 8000);
        assert_eq!(s.transcription.chunk_duration_secs, 300);
        assert_eq!(s.orchestrator.diarization_timeout_secs, 600);
        assert_eq!(s.orchestrator.transcription_timeout_secs, 900);
        assert_eq!(s.transcription.download_timeout_secs, 300);
        assert_eq!(s.logging.level, "info");
    }

    #[test]
    fn diarization_requires_credential() {
        let mut d = DiarizationSettings::default();
        assert!(!d.is_available());
        d.access_token = Some(String::new());
        assert!(!d.is_available());
        d.access_token = Some("hf_abc".into());
        assert!(d.is_available());
        d.enabled = false;
        assert!(!d.is_available());
    }

    #[test]
    fn serializes_camel_case_without_secrets() {
        let json = serde_json::to_value(ParleySettings::default()).unwrap();
        assert!(json["transcription"]["chunkDurationSecs"].is_u64());
        assert!(json["orchestrator"].get("apiKey").is_none());
        assert!(json["diarization"].get("accessToken").is_none());
    }
}
