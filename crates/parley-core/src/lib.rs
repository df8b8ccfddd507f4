//! # parley-core
//!
//! Foundation types, errors, and collaborator seams for the parley
//! transcription service.
//!
//! This crate provides the shared vocabulary that all other parley crates depend on:
//!
//! - **Domain model**: [`AudioAsset`], [`Chunk`], [`Segment`], [`SpeakerSegment`],
//!   [`DiarizationResult`], [`TranscriptionResult`]
//! - **Errors**: [`JobError`] (the terminal job taxonomy) and [`CollaboratorError`]
//! - **Collaborators**: async traits for speech recognition, diarization,
//!   accelerator memory, normalisation, and chunk slicing
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber

#![deny(unsafe_code)]

pub mod collaborators;
pub mod errors;
pub mod logging;
pub mod types;

pub use collaborators::{
    Accelerator, AsrOptions, AudioNormalizer, ChunkSlicer, ChunkTranscript, CpuAccelerator,
    Diarizer, SpeechRecognizer,
};
pub use errors::{CollaboratorError, JobError, JobResultExt, Stage};
pub use types::{
    AudioAsset, Chunk, DiarizationResult, Segment, SpeakerSegment, TranscriptionResult,
    UNKNOWN_SPEAKER,
};
