//! # parley-pipeline
//!
//! The job core: everything between a normalised audio asset and a rendered
//! response.
//!
//! - [`planner`]: splits an asset into contiguous fixed-length chunks
//! - [`pipeline`]: transcribes chunks sequentially and shifts them to global time
//! - [`aligner`]: labels transcript segments with the best-overlapping speaker
//! - [`lifecycle`]: sequences diarization and transcription on one accelerator
//! - [`formatter`]: renders `json`, `text`, `srt`, `vtt`, and `verbose_json`
//! - [`cleanup`]: per-job scratch directory released on every exit path
//! - [`services`]: long-lived model handles shared by all jobs
//! - [`job`]: the end-to-end local job runner
//! - [`diarization_job`]: diarization-only jobs for the remote worker

#![deny(unsafe_code)]

pub mod aligner;
pub mod cleanup;
pub mod diarization_job;
pub mod formatter;
pub mod job;
pub mod lifecycle;
pub mod pipeline;
pub mod planner;
pub mod services;

pub use cleanup::CleanupScope;
pub use diarization_job::{DiarizationJobRunner, diarization_output};
pub use formatter::{FormatOptions, RenderedOutput, ResponseFormat};
pub use job::{JobConfig, LocalJobRunner, TranscriptionRequest};
pub use lifecycle::{DiarizationPlan, LifecycleOutcome, LifecyclePhase, ResourceLifecycleManager};
pub use pipeline::TranscriptionPipeline;
pub use planner::ChunkPlanner;
pub use services::ModelServices;
