//! Chunk planning.
//!
//! A plan covers `[0, duration)` with `ceil(duration / max)` contiguous,
//! non-overlapping chunks. Every chunk but the last is exactly `max` long.

use parley_core::{AudioAsset, Chunk, JobError, Stage};

/// Splits audio assets into fixed-length chunks.
#[derive(Clone, Copy, Debug)]
pub struct ChunkPlanner {
    max_chunk_duration: f64,
}

impl ChunkPlanner {
    /// Create a planner with the given maximum chunk length in seconds.
    pub fn new(max_chunk_duration: f64) -> Result<Self, JobError> {
        if !max_chunk_duration.is_finite() || max_chunk_duration <= 0.0 {
            return Err(JobError::stage(
                Stage::Chunking,
                format!("chunk duration must be positive, got {max_chunk_duration}"),
            ));
        }
        Ok(Self { max_chunk_duration })
    }

    /// Maximum chunk length in seconds.
    pub fn max_chunk_duration(&self) -> f64 {
        self.max_chunk_duration
    }

    /// Plan chunks for `asset`. An empty asset yields an empty plan.
    pub fn plan(&self, asset: &AudioAsset) -> Result<Vec<Chunk>, JobError> {
        plan_chunks(asset.duration, self.max_chunk_duration)
    }
}

/// Plan chunks for an asset of `duration` seconds.
pub fn plan_chunks(duration: f64, max_chunk_duration: f64) -> Result<Vec<Chunk>, JobError> {
    if !duration.is_finite() || duration < 0.0 {
        return Err(JobError::stage(
            Stage::Chunking,
            format!("invalid audio duration {duration}"),
        ));
    }
    if duration == 0.0 {
        return Ok(Vec::new());
    }

    let count = chunk_count(duration, max_chunk_duration);
    let chunks = (0..count)
        .map(|index| {
            #[allow(clippy::cast_precision_loss)]
            let start_offset = index as f64 * max_chunk_duration;
            let duration = if index + 1 == count {
                (duration - start_offset).clamp(0.0, max_chunk_duration)
            } else {
                max_chunk_duration
            };
            Chunk {
                index,
                start_offset,
                duration,
                data_ref: None,
            }
        })
        .collect();
    Ok(chunks)
}

/// Number of chunks needed to cover `duration`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn chunk_count(duration: f64, max_chunk_duration: f64) -> usize {
    (duration / max_chunk_duration).ceil() as usize
}

// ─── Tests ───────────────────────────────────────────────────────────────────
