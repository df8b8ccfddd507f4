//! # parley-server
//!
//! Axum HTTP surface for the three parley process roles.
//!
//! - `transcription`: OpenAI-compatible upload route plus the serverless
//!   `/runsync` job route
//! - `diarization`: `/runsync` diarization jobs
//! - `orchestrator`: `/runsync` jobs fanned out to the two remote endpoints
//! - Health checks on every role
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod request;
pub mod server;
pub mod shutdown;

pub use config::{Role, ServerConfig};
pub use handlers::{
    DiarizationHandler, JobHandler, ModelStatus, OrchestratorHandler, TranscriptionHandler,
};
pub use server::{AppState, ParleyServer};
pub use shutdown::ShutdownCoordinator;
