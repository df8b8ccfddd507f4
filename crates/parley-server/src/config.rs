//! Server configuration.

use std::fmt;
use std::str::FromStr;

use parley_settings::ServerSettings;
use serde::{Deserialize, Serialize};

/// Which job surface a process exposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Local transcription with optional local diarization.
    #[default]
    Transcription,
    /// Diarization-only worker.
    Diarization,
    /// Coordinator of the remote diarization and transcription workers.
    Orchestrator,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcription => "transcription",
            Self::Diarization => "diarization",
            Self::Orchestrator => "orchestrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transcription" => Ok(Self::Transcription),
            "diarization" => Ok(Self::Diarization),
            "orchestrator" => Ok(Self::Orchestrator),
            other => Err(format!(
                "unknown role '{other}' (expected transcription, diarization, or orchestrator)"
            )),
        }
    }
}

/// Configuration for the parley server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Max request body size in bytes.
    pub max_upload_bytes: usize,
    /// Job surface to expose.
    pub role: Role,
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &ServerSettings, role: Role) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_upload_bytes: usize::try_from(settings.max_upload_bytes).unwrap_or(usize::MAX),
            role,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            max_upload_bytes: 500 * 1024 * 1024, // 500 MiB
            role: Role::Transcription,
        }
    }
}
