//! Conversion of arbitrary input audio into the canonical asset format.

use std::path::Path;

use async_trait::async_trait;
use parley_core::{AudioAsset, AudioNormalizer, CollaboratorError};
use tracing::{debug, info};

use crate::decode::{TARGET_SAMPLE_RATE, decode_file};
use crate::errors::AudioError;
use crate::wav::write_mono;

/// File name of the normalised asset inside the job directory.
pub const NORMALIZED_FILE_NAME: &str = "normalized.wav";

/// Decodes with symphonia, resamples with rubato, writes 16-bit mono WAV.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaNormalizer;

impl SymphoniaNormalizer {
    /// Blocking normalisation of `input` into `work_dir`.
    pub fn normalize_blocking(input: &Path, work_dir: &Path) -> Result<AudioAsset, AudioError> {
        let (samples, source_rate) = decode_file(input)?;
        let output = work_dir.join(NORMALIZED_FILE_NAME);
        write_mono(&output, &samples, TARGET_SAMPLE_RATE)?;

        let duration = samples.len() as f64 / f64::from(TARGET_SAMPLE_RATE);
        debug!(source_rate, samples = samples.len(), "decoded input audio");
        Ok(AudioAsset::new(output, duration, TARGET_SAMPLE_RATE))
    }
}

#[async_trait]
impl AudioNormalizer for SymphoniaNormalizer {
    async fn normalize(
        &self,
        input: &Path,
        work_dir: &Path,
    ) -> Result<AudioAsset, CollaboratorError> {
        let input = input.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let asset = tokio::task::spawn_blocking(move || Self::normalize_blocking(&input, &work_dir))
            .await
            .map_err(|e| CollaboratorError::Io(std::io::Error::other(e)))??;

        info!(duration_secs = asset.duration, "audio normalized");
        Ok(asset)
    }
}
