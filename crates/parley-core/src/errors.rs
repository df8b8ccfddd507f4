//! Error taxonomy for transcription jobs.
//!
//! - [`JobError`]: terminal failure of a job, carrying a wire code and an HTTP
//!   status class. Soft stage failures and cleanup failures never become a
//!   `JobError`; they are logged where they happen.
//! - [`CollaboratorError`]: failure inside a recognizer, diarizer, accelerator,
//!   or audio collaborator.

use std::fmt;

use thiserror::Error;

/// Wire code for malformed or unsupported input.
pub const INVALID_INPUT: &str = "INVALID_INPUT";
/// Wire code for a collaborator that is not loaded yet.
pub const NOT_READY: &str = "NOT_READY";

/// Pipeline stage that can fail a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Fetching or decoding the submitted payload.
    Acquisition,
    /// Converting to the canonical audio format.
    Normalization,
    /// Slicing the asset into chunk files.
    Chunking,
    /// Speaker diarization (hard only when it is the job's sole purpose).
    Diarization,
    /// Speech recognition.
    Transcription,
    /// Rendering the response.
    Formatting,
    /// Anything else inside the job boundary.
    Internal,
}

impl Stage {
    /// Wire code reported when this stage fails a job.
    pub fn code(self) -> &'static str {
        match self {
            Self::Acquisition => "ACQUISITION_FAILED",
            Self::Normalization => "NORMALIZATION_FAILED",
            Self::Chunking => "CHUNKING_FAILED",
            Self::Diarization => "DIARIZATION_FAILED",
            Self::Transcription => "TRANSCRIPTION_FAILED",
            Self::Formatting => "FORMATTING_FAILED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Acquisition => "Acquisition",
            Self::Normalization => "Normalization",
            Self::Chunking => "Chunking",
            Self::Diarization => "Diarization",
            Self::Transcription => "Transcription",
            Self::Formatting => "Formatting",
            Self::Internal => "Job",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a transcription, diarization, or orchestration job.
#[derive(Debug, Error)]
pub enum JobError {
    /// Malformed request, unsupported format, or missing payload.
    #[error("{message}")]
    Input {
        /// Human-readable message.
        message: String,
    },

    /// A required collaborator is not loaded yet. Retryable.
    #[error("{message}")]
    Unavailable {
        /// Human-readable message.
        message: String,
    },

    /// A mandatory stage failed.
    #[error("{stage} failed: {message}")]
    Stage {
        /// Which stage failed.
        stage: Stage,
        /// Human-readable message.
        message: String,
    },
}

impl JobError {
    /// Create an input error.
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a not-ready error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a hard stage failure.
    pub fn stage(stage: Stage, message: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            message: message.into(),
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Input { .. } => INVALID_INPUT,
            Self::Unavailable { .. } => NOT_READY,
            Self::Stage { stage, .. } => stage.code(),
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// HTTP status class for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Input { .. } => 400,
            Self::Unavailable { .. } => 503,
            Self::Stage { .. } => 500,
        }
    }
}

/// Failure inside a collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The model behind the collaborator is not loaded.
    #[error("model not loaded: {0}")]
    NotLoaded(String),

    /// The model ran but failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The collaborator could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The collaborator answered with something unreadable.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Local file handling failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extension trait for wrapping arbitrary errors into [`JobError`].
pub trait JobResultExt<T> {
    /// Wrap the error as an [`JobError::Input`] with a context prefix.
    fn input_err(self, context: &str) -> Result<T, JobError>;

    /// Wrap the error as a hard failure of `stage` with a context prefix.
    fn stage_err(self, stage: Stage, context: &str) -> Result<T, JobError>;
}

impl<T, E: fmt::Display> JobResultExt<T> for Result<T, E> {
    fn input_err(self, context: &str) -> Result<T, JobError> {
        self.map_err(|e| JobError::input(format!("{context}: {e}")))
    }

    fn stage_err(self, stage: Stage, context: &str) -> Result<T, JobError> {
        self.map_err(|e| JobError::stage(stage, format!("{context}: {e}")))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
