//! Materialising planned chunks as WAV files.

use std::path::Path;

use async_trait::async_trait;
use parley_core::{AudioAsset, Chunk, ChunkSlicer, CollaboratorError};
use tracing::debug;

use crate::errors::AudioError;
use crate::wav::{read_mono, write_mono};

/// Slices a normalised WAV asset into per-chunk WAV files.
#[derive(Clone, Copy, Debug, Default)]
pub struct WavSlicer;

impl WavSlicer {
    /// Blocking slice of `asset` into `work_dir`.
    pub fn slice_blocking(
        asset: &AudioAsset,
        chunks: &[Chunk],
        work_dir: &Path,
    ) -> Result<Vec<Chunk>, AudioError> {
        if chunks.len() == 1 {
            let mut only = chunks[0].clone();
            only.data_ref = Some(asset.path.clone());
            return Ok(vec![only]);
        }

        let (samples, rate) = read_mono(&asset.path)?;
        let rate = f64::from(rate);

        chunks
            .iter()
            .map(|chunk| {
                let start = sample_index(chunk.start_offset, rate).min(samples.len());
                let end = sample_index(chunk.end_offset(), rate).min(samples.len());
                let path = work_dir.join(format!("chunk_{:04}.wav", chunk.index));
                write_mono(&path, &samples[start..end.max(start)], asset.sample_rate)?;
                debug!(chunk = chunk.index, start, end, "wrote chunk");

                let mut sliced = chunk.clone();
                sliced.data_ref = Some(path);
                Ok(sliced)
            })
            .collect()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample_index(seconds: f64, rate: f64) -> usize {
    (seconds * rate).round().max(0.0) as usize
}

#[async_trait]
impl ChunkSlicer for WavSlicer {
    async fn slice(
        &self,
        asset: &AudioAsset,
        chunks: &[Chunk],
        work_dir: &Path,
    ) -> Result<Vec<Chunk>, CollaboratorError> {
        let asset = asset.clone();
        let chunks = chunks.to_vec();
        let work_dir = work_dir.to_path_buf();
        let sliced =
            tokio::task::spawn_blocking(move || Self::slice_blocking(&asset, &chunks, &work_dir))
                .await
                .map_err(|e| CollaboratorError::Io(std::io::Error::other(e)))??;
        Ok(sliced)
    }
}
