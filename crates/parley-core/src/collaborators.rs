//! Seams to the models and tools a job depends on.
//!
//! Every trait is object-safe and shared as `Arc<dyn Trait>`. Implementations
//! live in `parley-audio` (normalisation, slicing) and `parley-remote` (model
//! sidecars reached over HTTP).

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CollaboratorError;
use crate::types::{AudioAsset, Chunk, DiarizationResult, Segment};

/// Options forwarded to the speech recognizer for every chunk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AsrOptions {
    /// Language hint, passed through unmodified.
    pub language: Option<String>,
    /// Request word-level timestamps.
    pub word_timestamps: bool,
    /// Sampling temperature, passed through unmodified.
    pub temperature: f32,
}

/// Recognizer output for one chunk, in chunk-local time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkTranscript {
    /// Transcript text of the chunk.
    pub text: String,
    /// Segments relative to the chunk start.
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// Converts chunk audio into text and timed segments.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe a single chunk file.
    async fn transcribe(
        &self,
        chunk: &Path,
        options: &AsrOptions,
    ) -> Result<ChunkTranscript, CollaboratorError>;

    /// Identifier of the loaded model.
    fn model_id(&self) -> &str;

    /// Whether the model is ready to serve requests.
    fn is_loaded(&self) -> bool {
        true
    }
}

/// Segments audio by speaker.
#[async_trait]
pub trait Diarizer: Send + Sync {
    /// Diarize the full asset.
    async fn diarize(
        &self,
        audio: &Path,
        num_speakers: Option<u32>,
    ) -> Result<DiarizationResult, CollaboratorError>;

    /// Move the model off the accelerator. The next [`Diarizer::diarize`]
    /// call re-acquires it.
    async fn release(&self) -> Result<(), CollaboratorError>;
}

/// Accelerator device whose transient memory must be cleared between stages.
#[async_trait]
pub trait Accelerator: Send + Sync {
    /// Device name reported in health checks.
    fn device(&self) -> &str;

    /// Clear the device's transient memory cache.
    async fn empty_cache(&self) -> Result<(), CollaboratorError>;
}

/// Accelerator for CPU-only hosts. Clearing the cache is a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuAccelerator;

#[async_trait]
impl Accelerator for CpuAccelerator {
    fn device(&self) -> &str {
        "cpu"
    }

    async fn empty_cache(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Converts arbitrary input audio into the canonical mono 16 kHz format.
#[async_trait]
pub trait AudioNormalizer: Send + Sync {
    /// Normalise `input`, writing the result into `work_dir`.
    async fn normalize(&self, input: &Path, work_dir: &Path)
    -> Result<AudioAsset, CollaboratorError>;
}

/// Materialises planned chunks as audio files.
#[async_trait]
pub trait ChunkSlicer: Send + Sync {
    /// Write one file per chunk under `work_dir` and return the chunks with
    /// `data_ref` set.
    async fn slice(
        &self,
        asset: &AudioAsset,
        chunks: &[Chunk],
        work_dir: &Path,
    ) -> Result<Vec<Chunk>, CollaboratorError>;
}
