//! # parley-settings
//!
//! Configuration for the parley transcription service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** - [`ParleySettings::default()`]
//! 2. **Settings file** - `~/.parley/settings.json` or an explicit path (deep-merged over defaults)
//! 3. **Environment variables** - `PARLEY_*` plus the credential variables
//!    (`HUGGINGFACE_ACCESS_TOKEN`, `RUNPOD_API_KEY`, endpoint ids)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_env_overrides_with, deep_merge, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::{
    DiarizationSettings, LoggingSettings, OrchestratorSettings, ParleySettings, ServerSettings,
    TranscriptionSettings,
};
