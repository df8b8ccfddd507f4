//! Diarization-only jobs for the remote diarization worker.
//!
//! acquire → normalise → diarize. Unlike the local job, diarization here is
//! the whole job, so a diarizer failure is terminal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_audio::AudioSource;
use parley_core::{AudioNormalizer, DiarizationResult, Diarizer, JobError, JobResultExt, Stage};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::cleanup::CleanupScope;
use crate::job::acquisition_error;

/// Runs diarization jobs against a single diarizer.
pub struct DiarizationJobRunner {
    diarizer: Arc<dyn Diarizer>,
    normalizer: Arc<dyn AudioNormalizer>,
    http: reqwest::Client,
    temp_dir: std::path::PathBuf,
    download_timeout: Duration,
    lease: Mutex<()>,
}

impl DiarizationJobRunner {
    /// Create a runner writing scratch files under `temp_dir`.
    pub fn new(
        diarizer: Arc<dyn Diarizer>,
        normalizer: Arc<dyn AudioNormalizer>,
        http: reqwest::Client,
        temp_dir: impl Into<std::path::PathBuf>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            diarizer,
            normalizer,
            http,
            temp_dir: temp_dir.into(),
            download_timeout,
            lease: Mutex::new(()),
        }
    }

    /// Diarize `source` and return the worker output.
    pub async fn run(
        &self,
        source: AudioSource,
        num_speakers: Option<u32>,
    ) -> Result<DiarizationResult, JobError> {
        let span = info_span!("diarization_job", job_id = %Uuid::now_v7(), source = source.kind());
        self.run_inner(source, num_speakers).instrument(span).await
    }

    async fn run_inner(
        &self,
        source: AudioSource,
        num_speakers: Option<u32>,
    ) -> Result<DiarizationResult, JobError> {
        let started = Instant::now();
        let mut scope = CleanupScope::in_dir(&self.temp_dir)
            .stage_err(Stage::Internal, "create job directory")?;

        let input = source
            .materialize(scope.dir(), &self.http, self.download_timeout)
            .await
            .map_err(acquisition_error)?;
        scope.register_file(&input);

        let asset = self
            .normalizer
            .normalize(&input, scope.dir())
            .await
            .stage_err(Stage::Normalization, "convert to 16 kHz mono")?;
        scope.register_file(&asset.path);

        let result = {
            let _lease = self.lease.lock().await;
            self.diarizer
                .diarize(&asset.path, num_speakers)
                .await
                .stage_err(Stage::Diarization, "speaker diarization")?
        };

        let _ = scope.release();
        info!(
            speakers = result.num_speakers,
            segments = result.segments.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "diarization job complete"
        );
        Ok(result)
    }
}

/// Worker output for a diarization job.
///
/// `duration` is the end of the last speaker turn, `0.0` when nobody spoke.
pub fn diarization_output(result: &DiarizationResult) -> Value {
    json!({
        "segments": result.segments,
        "num_speakers": result.num_speakers,
        "duration": result.duration(),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parley_core::{AudioAsset, CollaboratorError, SpeakerSegment};

    use super::*;

    struct CopyNormalizer;

    #[async_trait]
    impl AudioNormalizer for CopyNormalizer {
        async fn normalize(
            &self,
            input: &Path,
            work_dir: &Path,
        ) -> Result<AudioAsset, CollaboratorError> {
            let out = work_dir.join("normalized.wav");
            let _ = tokio::fs::copy(input, &out).await?;
            Ok(AudioAsset::new(out, 4.0, 16_000))
        }
    }

    struct Scripted(Result<Vec<SpeakerSegment>, ()>);

    #[async_trait]
    impl Diarizer for Scripted {
        async fn diarize(
            &self,
            audio: &Path,
            _num_speakers: Option<u32>,
        ) -> Result<DiarizationResult, CollaboratorError> {
            assert!(audio.exists());
            match &self.0 {
                Ok(segments) => Ok(DiarizationResult::from_segments(segments.clone())),
                Err(()) => Err(CollaboratorError::Inference("OOM".into())),
            }
        }

        async fn release(&self) -> Result<(), CollaboratorError> {
            Ok(())
        }
    }

    fn runner(diarizer: Scripted, dir: &Path) -> DiarizationJobRunner {
        DiarizationJobRunner::new(
            Arc::new(diarizer),
            Arc::new(CopyNormalizer),
            reqwest::Client::new(),
            dir,
            Duration::from_secs(5),
        )
    }

    fn upload() -> AudioSource {
        AudioSource::Upload {
            bytes: b"fake".to_vec(),
            filename: Some("a.wav".into()),
        }
    }

    #[tokio::test]
    async fn diarizes_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let r = runner(
            Scripted(Ok(vec![
                SpeakerSegment::new(1.5, 3.0, "2"),
                SpeakerSegment::new(0.0, 1.5, "1"),
            ])),
            dir.path(),
        );
        let result = r.run(upload(), Some(2)).await.unwrap();

        let out = diarization_output(&result);
        assert_eq!(out["num_speakers"], 2);
        assert_eq!(out["duration"], 3.0);
        assert_eq!(out["segments"][0]["speaker"], "1");
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn diarizer_failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner(Scripted(Err(())), dir.path())
            .run(upload(), None)
            .await
            .unwrap_err();
        assert_matches!(err, JobError::Stage { stage: Stage::Diarization, .. });
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn empty_result_output() {
        let out = diarization_output(&DiarizationResult::from_segments(Vec::new()));
        assert_eq!(out, json!({"segments": [], "num_speakers": 0, "duration": 0.0}));
    }
}
