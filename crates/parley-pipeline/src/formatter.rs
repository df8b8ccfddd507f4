//! Response rendering.

use std::fmt::Write as _;
use std::str::FromStr;

use parley_core::{JobError, Segment, TranscriptionResult};
use serde_json::{Value, json};

/// Speaking rate used to estimate duration when segments carry no timing.
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// Output format requested by the client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    /// `{text, segments?}`
    #[default]
    Json,
    /// Plain transcript text.
    Text,
    /// SubRip subtitles.
    Srt,
    /// WebVTT subtitles.
    Vtt,
    /// `{text, language, duration, model, segments}` with speaker labels.
    VerboseJson,
}

impl ResponseFormat {
    /// Wire name of the format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::VerboseJson => "verbose_json",
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "srt" => Ok(Self::Srt),
            "vtt" => Ok(Self::Vtt),
            "verbose_json" => Ok(Self::VerboseJson),
            other => Err(JobError::input(format!(
                "Unsupported response format: {other}. Allowed: json, text, srt, vtt, verbose_json"
            ))),
        }
    }
}

/// Rendering knobs that do not come from the transcript itself.
#[derive(Clone, Debug, Default)]
pub struct FormatOptions {
    /// Include segments in `json` output.
    pub include_segments: bool,
    /// Model name reported by `verbose_json`.
    pub model_name: String,
}

/// A rendered response body.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderedOutput {
    /// JSON document.
    Json(Value),
    /// Plain text (`text`, `srt`, `vtt`).
    Text(String),
}

impl RenderedOutput {
    /// Body for a serverless worker, which always answers with JSON.
    /// Text bodies are wrapped as `{"text": ...}`.
    pub fn into_worker_output(self) -> Value {
        match self {
            Self::Json(v) => v,
            Self::Text(t) => json!({ "text": t }),
        }
    }
}

/// Render `result` as `format`.
pub fn render(
    result: &TranscriptionResult,
    format: ResponseFormat,
    options: &FormatOptions,
) -> RenderedOutput {
    match format {
        ResponseFormat::Json => {
            let mut body = json!({ "text": result.text });
            if options.include_segments {
                body["segments"] = json!(result.segments);
            }
            RenderedOutput::Json(body)
        }
        ResponseFormat::Text => RenderedOutput::Text(result.text.clone()),
        ResponseFormat::Srt => RenderedOutput::Text(to_srt(&result.segments)),
        ResponseFormat::Vtt => RenderedOutput::Text(to_vtt(&result.segments)),
        ResponseFormat::VerboseJson => {
            let mut body = json!({
                "text": result.text,
                "duration": estimate_duration(result),
                "model": options.model_name,
                "segments": result.segments,
            });
            if let Some(language) = &result.language {
                body["language"] = json!(language);
            }
            RenderedOutput::Json(body)
        }
    }
}

/// Duration reported by `verbose_json`, in seconds.
///
/// The sum of segment durations when any segment has timing, otherwise the
/// word count at [`WORDS_PER_MINUTE`].
pub fn estimate_duration(result: &TranscriptionResult) -> f64 {
    let timed: f64 = result.segments.iter().map(Segment::duration).sum();
    if timed > 0.0 {
        return timed;
    }
    #[allow(clippy::cast_precision_loss)]
    let words = result.word_count() as f64;
    words / WORDS_PER_MINUTE * 60.0
}

/// Render segments as SubRip.
pub fn to_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            timestamp(seg.start, ','),
            timestamp(seg.end, ','),
            seg.text.trim()
        );
    }
    out
}

/// Render segments as WebVTT.
pub fn to_vtt(segments: &[Segment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for (i, seg) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            timestamp(seg.start, '.'),
            timestamp(seg.end, '.'),
            seg.text.trim()
        );
    }
    out
}

/// `HH:MM:SS<sep>mmm`, rounded to the nearest millisecond.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn timestamp(seconds: f64, millis_separator: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}{millis_separator}{millis:03}")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
