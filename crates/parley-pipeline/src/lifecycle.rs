//! Accelerator-aware sequencing of diarization and transcription.
//!
//! The diarization model and the speech model never occupy the accelerator
//! at the same time:
//!
//! ```text
//! Idle ─▶ Diarizing ─▶ Releasing ─▶ Transcribing ─▶ Done
//!   └──────────────────────────────────▲
//!             (diarization skipped)
//! ```
//!
//! Diarization is a soft stage: failure or absence is logged and the job
//! continues without speaker labels. Transcription is a hard stage. A lease
//! ensures one job occupies the accelerator at a time.

use std::sync::Arc;
use std::time::Instant;

use parley_core::{
    Accelerator, AsrOptions, AudioAsset, Chunk, DiarizationResult, Diarizer, JobError,
    TranscriptionResult,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::pipeline::TranscriptionPipeline;

/// Phase of a job's accelerator lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Nothing on the accelerator.
    Idle,
    /// Diarization model running.
    Diarizing,
    /// Diarization model being moved off the accelerator.
    Releasing,
    /// Speech model running.
    Transcribing,
    /// Job finished.
    Done,
}

/// What to do about speaker diarization for one job.
#[derive(Clone, Debug, PartialEq)]
pub enum DiarizationPlan {
    /// Transcribe only.
    Skip,
    /// Run the local diarizer first.
    Run {
        /// Expected number of speakers, when known.
        num_speakers: Option<u32>,
    },
    /// Use segments computed elsewhere.
    Provided(DiarizationResult),
}

/// Result of [`ResourceLifecycleManager::execute`].
#[derive(Debug)]
pub struct LifecycleOutcome {
    /// Transcript in global time, not yet speaker-labelled.
    pub transcription: TranscriptionResult,
    /// Non-empty diarization, when one was obtained.
    pub diarization: Option<DiarizationResult>,
    /// Phases visited, in order.
    pub phases: Vec<LifecyclePhase>,
}

/// Runs the diarize → release → transcribe sequence on one accelerator.
pub struct ResourceLifecycleManager {
    diarizer: Option<Arc<dyn Diarizer>>,
    accelerator: Arc<dyn Accelerator>,
    lease: Mutex<()>,
}

impl ResourceLifecycleManager {
    /// Create a manager. Without a diarizer every job transcribes only.
    pub fn new(diarizer: Option<Arc<dyn Diarizer>>, accelerator: Arc<dyn Accelerator>) -> Self {
        Self {
            diarizer,
            accelerator,
            lease: Mutex::new(()),
        }
    }

    /// Whether a diarizer is configured.
    pub fn can_diarize(&self) -> bool {
        self.diarizer.is_some()
    }

    /// Run one job's model stages.
    pub async fn execute(
        &self,
        asset: &AudioAsset,
        plan: DiarizationPlan,
        pipeline: &TranscriptionPipeline,
        chunks: &[Chunk],
        options: &AsrOptions,
    ) -> Result<LifecycleOutcome, JobError> {
        let _lease = self.lease.lock().await;
        let mut phases = vec![LifecyclePhase::Idle];

        let diarization = match plan {
            DiarizationPlan::Skip => None,
            DiarizationPlan::Provided(result) => Some(result),
            DiarizationPlan::Run { num_speakers } => match &self.diarizer {
                Some(diarizer) => {
                    phases.push(LifecyclePhase::Diarizing);
                    let result = self.diarize(diarizer.as_ref(), asset, num_speakers).await;
                    phases.push(LifecyclePhase::Releasing);
                    self.release(diarizer.as_ref()).await;
                    result
                }
                None => {
                    warn!("diarization requested but no diarizer is available, skipping");
                    None
                }
            },
        }
        .filter(|d| !d.is_empty());

        phases.push(LifecyclePhase::Transcribing);
        let transcription = pipeline.run(chunks, options).await?;
        phases.push(LifecyclePhase::Done);

        Ok(LifecycleOutcome {
            transcription,
            diarization,
            phases,
        })
    }

    async fn diarize(
        &self,
        diarizer: &dyn Diarizer,
        asset: &AudioAsset,
        num_speakers: Option<u32>,
    ) -> Option<DiarizationResult> {
        let started = Instant::now();
        match diarizer.diarize(&asset.path, num_speakers).await {
            Ok(result) => {
                info!(
                    speakers = result.num_speakers,
                    segments = result.segments.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "diarization complete"
                );
                Some(result)
            }
            Err(e) => {
                warn!(error = %e, "diarization failed, continuing without speaker labels");
                None
            }
        }
    }

    async fn release(&self, diarizer: &dyn Diarizer) {
        if let Err(e) = diarizer.release().await {
            warn!(error = %e, "failed to release diarization model");
        }
        if let Err(e) = self.accelerator.empty_cache().await {
            warn!(error = %e, "failed to clear accelerator cache after diarization");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
