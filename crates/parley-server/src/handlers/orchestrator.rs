use async_trait::async_trait;
use parley_core::JobError;
use parley_remote::{Orchestrator, OrchestratorInput};
use serde_json::Value;

use super::{JobHandler, ModelStatus};

/// Orchestrator: fans a job out to the remote diarization and transcription
/// endpoints.
#[derive(Debug)]
pub struct OrchestratorHandler {
    orchestrator: Orchestrator,
}

impl OrchestratorHandler {
    /// Wrap a configured orchestrator.
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl JobHandler for OrchestratorHandler {
    async fn handle(&self, input: Value) -> Result<Value, JobError> {
        let input: OrchestratorInput = serde_json::from_value(input)
            .map_err(|e| JobError::input(format!("Invalid job input: {e}")))?;
        self.orchestrator.run(input).await
    }

    fn status(&self) -> ModelStatus {
        ModelStatus {
            model_loaded: true,
            model_id: None,
            diarization_available: true,
            device: "remote".into(),
        }
    }
}
