//! Job handlers for each process role, plus the HTTP route handlers that
//! drive them.

mod diarization;
mod orchestrator;
pub mod runsync;
mod transcription;
pub mod upload;

use async_trait::async_trait;
use parley_core::JobError;
use serde_json::Value;

pub use diarization::DiarizationHandler;
pub use orchestrator::OrchestratorHandler;
pub use transcription::TranscriptionHandler;

/// Live model status reported by `/health`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelStatus {
    /// Whether jobs can run now.
    pub model_loaded: bool,
    /// Configured model identifier.
    pub model_id: Option<String>,
    /// Whether jobs can be diarized.
    pub diarization_available: bool,
    /// Accelerator device name.
    pub device: String,
}

/// Runs one serverless job for a process role.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Execute a job from its `input` object and return the worker output.
    async fn handle(&self, input: Value) -> Result<Value, JobError>;

    /// Current model status.
    fn status(&self) -> ModelStatus;
}
