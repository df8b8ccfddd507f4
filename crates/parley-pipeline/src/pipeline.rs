//! Sequential chunk transcription.

use std::sync::Arc;
use std::time::Instant;

use parley_core::{
    Accelerator, AsrOptions, Chunk, JobError, SpeechRecognizer, Stage, TranscriptionResult,
};
use tracing::{debug, info, warn};

/// Transcribes planned chunks one at a time and aggregates them in global time.
///
/// Before each chunk the accelerator cache is cleared. Segment times from
/// chunk `i` are shifted by `i * chunk_duration`. Any chunk failure fails the
/// whole run; partial results are discarded.
pub struct TranscriptionPipeline {
    recognizer: Arc<dyn SpeechRecognizer>,
    accelerator: Arc<dyn Accelerator>,
    chunk_duration: f64,
}

impl TranscriptionPipeline {
    /// Create a pipeline for chunks planned with `chunk_duration`.
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        accelerator: Arc<dyn Accelerator>,
        chunk_duration: f64,
    ) -> Self {
        Self {
            recognizer,
            accelerator,
            chunk_duration,
        }
    }

    /// Identifier of the underlying recognizer model.
    pub fn model_id(&self) -> &str {
        self.recognizer.model_id()
    }

    /// Transcribe `chunks` in order.
    pub async fn run(
        &self,
        chunks: &[Chunk],
        options: &AsrOptions,
    ) -> Result<TranscriptionResult, JobError> {
        let started = Instant::now();
        let mut texts = Vec::with_capacity(chunks.len());
        let mut segments = Vec::new();

        for chunk in chunks {
            let path = chunk.data_ref.as_deref().ok_or_else(|| {
                JobError::stage(
                    Stage::Chunking,
                    format!("chunk {} has no audio file", chunk.index),
                )
            })?;

            if let Err(e) = self.accelerator.empty_cache().await {
                warn!(chunk = chunk.index, error = %e, "failed to clear accelerator cache");
            }

            debug!(chunk = chunk.index, chunks = chunks.len(), "transcribing chunk");
            let transcript = self
                .recognizer
                .transcribe(path, options)
                .await
                .map_err(|e| {
                    JobError::stage(
                        Stage::Transcription,
                        format!("chunk {}: {e}", chunk.index),
                    )
                })?;

            #[allow(clippy::cast_precision_loss)]
            let offset = chunk.index as f64 * self.chunk_duration;
            for mut segment in transcript.segments {
                if chunk.index > 0 {
                    segment.shift(offset);
                }
                segments.push(segment);
            }
            texts.push(transcript.text);
        }

        info!(
            chunks = chunks.len(),
            segments = segments.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "transcription complete"
        );

        Ok(TranscriptionResult {
            text: texts.join(" "),
            segments,
            language: options.language.clone(),
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
