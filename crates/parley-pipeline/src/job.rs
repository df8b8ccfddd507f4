//! End-to-end local transcription job.
//!
//! acquire → normalise → plan → slice → (diarize → release) → transcribe →
//! align → format, with every temporary artifact tracked by a
//! [`CleanupScope`] that is released however the job ends.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_audio::{AudioError, AudioSource};
use parley_core::{
    AsrOptions, AudioNormalizer, ChunkSlicer, DiarizationResult, JobError, JobResultExt, Stage,
};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::aligner;
use crate::cleanup::CleanupScope;
use crate::formatter::{self, FormatOptions, RenderedOutput, ResponseFormat};
use crate::lifecycle::{DiarizationPlan, ResourceLifecycleManager};
use crate::pipeline::TranscriptionPipeline;
use crate::planner::ChunkPlanner;
use crate::services::ModelServices;

/// A validated transcription request.
#[derive(Clone, Debug)]
pub struct TranscriptionRequest {
    /// Where the audio comes from.
    pub source: AudioSource,
    /// Language hint for the recognizer.
    pub language: Option<String>,
    /// Output format.
    pub response_format: ResponseFormat,
    /// Include segments in `json` output.
    pub timestamps: bool,
    /// Ask the recognizer for word-level timing.
    pub word_timestamps: bool,
    /// Run local diarization before transcription.
    pub diarize: bool,
    /// Sampling temperature, passed through to the recognizer.
    pub temperature: f32,
    /// Expected number of speakers.
    pub num_speakers: Option<u32>,
    /// Diarization computed by a remote worker. Suppresses local diarization.
    pub diarization_segments: Option<DiarizationResult>,
}

impl TranscriptionRequest {
    /// A request with default options for `source`.
    pub fn new(source: AudioSource) -> Self {
        Self {
            source,
            language: None,
            response_format: ResponseFormat::Json,
            timestamps: false,
            word_timestamps: false,
            diarize: true,
            temperature: 0.0,
            num_speakers: None,
            diarization_segments: None,
        }
    }

    fn diarization_plan(&mut self) -> DiarizationPlan {
        match self.diarization_segments.take() {
            Some(provided) => DiarizationPlan::Provided(provided),
            None if self.diarize => DiarizationPlan::Run {
                num_speakers: self.num_speakers,
            },
            None => DiarizationPlan::Skip,
        }
    }
}

/// Runtime knobs for local jobs.
#[derive(Clone, Debug)]
pub struct JobConfig {
    /// Base directory for per-job scratch directories.
    pub temp_dir: PathBuf,
    /// Maximum chunk length in seconds.
    pub chunk_duration: f64,
    /// Timeout for URL downloads.
    pub download_timeout: Duration,
    /// Model name reported by `verbose_json`.
    pub model_name: String,
}

/// Runs transcription jobs against the shared model services.
pub struct LocalJobRunner {
    services: Arc<ModelServices>,
    lifecycle: ResourceLifecycleManager,
    normalizer: Arc<dyn AudioNormalizer>,
    slicer: Arc<dyn ChunkSlicer>,
    http: reqwest::Client,
    config: JobConfig,
}

impl LocalJobRunner {
    /// Create a runner. The lifecycle manager borrows the services' diarizer
    /// and accelerator.
    pub fn new(
        services: Arc<ModelServices>,
        normalizer: Arc<dyn AudioNormalizer>,
        slicer: Arc<dyn ChunkSlicer>,
        http: reqwest::Client,
        config: JobConfig,
    ) -> Self {
        let lifecycle = ResourceLifecycleManager::new(services.diarizer(), services.accelerator());
        Self {
            services,
            lifecycle,
            normalizer,
            slicer,
            http,
            config,
        }
    }

    /// The shared model services.
    pub fn services(&self) -> &Arc<ModelServices> {
        &self.services
    }

    /// Runtime configuration.
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Run one job to completion.
    pub async fn run(&self, request: TranscriptionRequest) -> Result<RenderedOutput, JobError> {
        let span = info_span!(
            "transcription_job",
            job_id = %Uuid::now_v7(),
            source = request.source.kind(),
            format = request.response_format.as_str(),
        );
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, mut request: TranscriptionRequest) -> Result<RenderedOutput, JobError> {
        let started = Instant::now();
        let recognizer = self.services.recognizer()?;
        let planner = ChunkPlanner::new(self.config.chunk_duration)?;

        let mut scope = CleanupScope::in_dir(&self.config.temp_dir)
            .stage_err(Stage::Internal, "create job directory")?;

        let input = request
            .source
            .materialize(scope.dir(), &self.http, self.config.download_timeout)
            .await
            .map_err(acquisition_error)?;
        scope.register_file(&input);

        let asset = self
            .normalizer
            .normalize(&input, scope.dir())
            .await
            .stage_err(Stage::Normalization, "convert to 16 kHz mono")?;
        scope.register_file(&asset.path);

        let plan = planner.plan(&asset)?;
        let chunk_dir = scope
            .create_subdir(&format!("chunks_{}", plan.len()))
            .stage_err(Stage::Chunking, "create chunk directory")?;
        let chunks = self
            .slicer
            .slice(&asset, &plan, &chunk_dir)
            .await
            .stage_err(Stage::Chunking, "split audio")?;
        for chunk in &chunks {
            if let Some(path) = chunk.data_ref.as_ref().filter(|p| **p != asset.path) {
                scope.register_file(path);
            }
        }
        info!(duration_secs = asset.duration, chunks = chunks.len(), "audio prepared");

        let pipeline = TranscriptionPipeline::new(
            recognizer,
            self.services.accelerator(),
            planner.max_chunk_duration(),
        );
        let options = AsrOptions {
            language: request.language.clone(),
            word_timestamps: request.word_timestamps,
            temperature: request.temperature,
        };
        let forwarded = request.diarization_segments.is_some();
        let diarization_plan = request.diarization_plan();

        let outcome = self
            .lifecycle
            .execute(&asset, diarization_plan, &pipeline, &chunks, &options)
            .await?;

        let mut transcription = outcome.transcription;
        if let Some(diarization) = &outcome.diarization {
            aligner::merge(diarization, &mut transcription.segments);
        }

        let rendered = formatter::render(
            &transcription,
            request.response_format,
            &FormatOptions {
                include_segments: request.timestamps || forwarded,
                model_name: self.config.model_name.clone(),
            },
        );

        let _ = scope.release();
        info!(
            speakers = outcome.diarization.as_ref().map_or(0, |d| d.num_speakers),
            segments = transcription.segments.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "job complete"
        );
        Ok(rendered)
    }
}

pub(crate) fn acquisition_error(err: AudioError) -> JobError {
    match err {
        AudioError::InvalidInput(message) => JobError::input(message),
        other => JobError::stage(Stage::Acquisition, other.to_string()),
    }
}
