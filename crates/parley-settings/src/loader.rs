//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ParleySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::ParleySettings;

/// Resolve the default settings file path (`~/.parley/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".parley").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ParleySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<ParleySettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<ParleySettings> {
    let defaults = serde_json::to_value(ParleySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let settings: ParleySettings = serde_json::from_value(merged)?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &ParleySettings) -> Result<()> {
    if settings.transcription.chunk_duration_secs == 0 {
        return Err(SettingsError::InvalidValue(
            "transcription.chunkDurationSecs must be positive".into(),
        ));
    }
    if settings.server.max_upload_bytes == 0 {
        return Err(SettingsError::InvalidValue(
            "server.maxUploadBytes must be positive".into(),
        ));
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut ParleySettings) {
    apply_env_overrides_with(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Empty values are ignored. Values that fail to parse are logged and
/// ignored, leaving the file/default value in place.
pub fn apply_env_overrides_with<F>(settings: &mut ParleySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("PARLEY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u64_range("PARLEY_PORT", 1, 65_535) {
        settings.server.port = u16::try_from(v).unwrap_or(settings.server.port);
    }
    if let Some(v) = env.u64_range("PARLEY_MAX_UPLOAD_BYTES", 1024, 8 * 1024 * 1024 * 1024) {
        settings.server.max_upload_bytes = v;
    }

    // ── Transcription ───────────────────────────────────────────────
    if let Some(v) = env.string("PARLEY_MODEL_ID") {
        settings.transcription.model_id = v;
    }
    if let Some(v) = env.u64_range("PARLEY_CHUNK_DURATION", 1, 3600) {
        settings.transcription.chunk_duration_secs = v;
    }
    if let Some(v) = env.string("PARLEY_TEMP_DIR") {
        settings.transcription.temp_dir = v;
    }
    if let Some(v) = env.string("PARLEY_ASR_URL") {
        settings.transcription.sidecar_url = v;
    }
    if let Some(v) = env.string("PARLEY_DEVICE") {
        settings.transcription.device = v;
    }

    // ── Diarization ─────────────────────────────────────────────────
    if let Some(v) = env.bool("PARLEY_DIARIZATION_ENABLED") {
        settings.diarization.enabled = v;
    }
    if let Some(v) = env.string("HUGGINGFACE_ACCESS_TOKEN") {
        settings.diarization.access_token = Some(v);
    }
    if let Some(v) = env.string("PARLEY_DIARIZATION_URL") {
        settings.diarization.sidecar_url = v;
    }

    // ── Orchestrator ────────────────────────────────────────────────
    if let Some(v) = env.string("PARLEY_ENDPOINT_BASE_URL") {
        settings.orchestrator.base_url = v;
    }
    if let Some(v) = env.string("DIARIZATION_ENDPOINT_ID") {
        settings.orchestrator.diarization_endpoint_id = Some(v);
    }
    if let Some(v) = env.string("TRANSCRIPTION_ENDPOINT_ID") {
        settings.orchestrator.transcription_endpoint_id = Some(v);
    }
    if let Some(v) = env.string("RUNPOD_API_KEY") {
        settings.orchestrator.api_key = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("PARLEY_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = self.string(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64_range(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, min, max, "invalid integer env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
