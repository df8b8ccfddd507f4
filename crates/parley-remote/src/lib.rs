//! # parley-remote
//!
//! Everything parley reaches over HTTP:
//!
//! - [`endpoint`]: [`EndpointClient`] for serverless `runsync` endpoints
//! - [`orchestrator`]: the distributed diarize-then-transcribe saga
//! - [`sidecar`]: recognizer, diarizer, and accelerator backed by local model servers

#![deny(unsafe_code)]

pub mod endpoint;
pub mod orchestrator;
pub mod sidecar;

pub use endpoint::{EndpointClient, EndpointError};
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorInput};
pub use sidecar::{SidecarAccelerator, SidecarDiarizer, SidecarRecognizer};
