use std::sync::Arc;

use async_trait::async_trait;
use parley_core::JobError;
use parley_pipeline::LocalJobRunner;
use serde_json::Value;

use super::{JobHandler, ModelStatus};
use crate::request::parse_transcription_input;

/// Transcription worker: local diarize-then-transcribe jobs.
pub struct TranscriptionHandler {
    runner: Arc<LocalJobRunner>,
}

impl TranscriptionHandler {
    /// Wrap a local job runner.
    pub fn new(runner: Arc<LocalJobRunner>) -> Self {
        Self { runner }
    }

    /// The runner, shared with the upload route.
    pub fn runner(&self) -> &Arc<LocalJobRunner> {
        &self.runner
    }
}

#[async_trait]
impl JobHandler for TranscriptionHandler {
    async fn handle(&self, input: Value) -> Result<Value, JobError> {
        let request = parse_transcription_input(input)?;
        let output = self.runner.run(request).await?;
        Ok(output.into_worker_output())
    }

    fn status(&self) -> ModelStatus {
        let services = self.runner.services();
        ModelStatus {
            model_loaded: services.is_loaded(),
            model_id: Some(services.model_id().to_string()),
            diarization_available: services.diarization_available(),
            device: services.accelerator().device().to_string(),
        }
    }
}
