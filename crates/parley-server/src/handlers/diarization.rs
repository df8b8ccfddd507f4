use async_trait::async_trait;
use parley_core::JobError;
use parley_pipeline::{DiarizationJobRunner, diarization_output};
use serde_json::Value;

use super::{JobHandler, ModelStatus};
use crate::request::parse_diarization_input;

/// Diarization worker: returns speaker turns for the whole asset.
pub struct DiarizationHandler {
    runner: DiarizationJobRunner,
    device: String,
}

impl DiarizationHandler {
    /// Wrap a diarization runner whose model lives on `device`.
    pub fn new(runner: DiarizationJobRunner, device: impl Into<String>) -> Self {
        Self {
            runner,
            device: device.into(),
        }
    }
}

#[async_trait]
impl JobHandler for DiarizationHandler {
    async fn handle(&self, input: Value) -> Result<Value, JobError> {
        let (source, num_speakers) = parse_diarization_input(input)?;
        let result = self.runner.run(source, num_speakers).await?;
        Ok(diarization_output(&result))
    }

    fn status(&self) -> ModelStatus {
        ModelStatus {
            model_loaded: true,
            model_id: None,
            diarization_available: true,
            device: self.device.clone(),
        }
    }
}
