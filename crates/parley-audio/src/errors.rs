//! Audio handling errors.

use parley_core::CollaboratorError;
use thiserror::Error;

/// Errors raised while acquiring, decoding, or writing audio.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The submitted payload is unusable (missing format, bad base64).
    #[error("{0}")]
    InvalidInput(String),

    /// Downloading a URL input failed.
    #[error("download failed: {0}")]
    Download(String),

    /// The container or codec could not be decoded.
    #[error("audio decode failed: {0}")]
    Decode(String),

    /// Resampling to the target rate failed.
    #[error("resample failed: {0}")]
    Resample(String),

    /// Reading or writing a WAV file failed.
    #[error("WAV I/O failed: {0}")]
    Wav(#[from] hound::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AudioError> for CollaboratorError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Io(e) => Self::Io(e),
            AudioError::Download(msg) => Self::Transport(msg),
            other => Self::Decode(other.to_string()),
        }
    }
}
