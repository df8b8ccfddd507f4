//! Domain model shared by every stage of a transcription job.
//!
//! Times are seconds as `f64`. Segment times are chunk-local when they leave a
//! recognizer and global once the pipeline has shifted them.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Label assigned to a segment that overlaps no diarization turn.
pub const UNKNOWN_SPEAKER: &str = "unknown";

/// Normalised audio input: mono, 16 kHz, single container.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioAsset {
    /// Location of the normalised audio file.
    pub path: PathBuf,
    /// Duration in seconds.
    pub duration: f64,
    /// Sample rate of the normalised file.
    pub sample_rate: u32,
}

impl AudioAsset {
    /// Create an asset descriptor.
    pub fn new(path: impl Into<PathBuf>, duration: f64, sample_rate: u32) -> Self {
        Self {
            path: path.into(),
            duration,
            sample_rate,
        }
    }
}

/// A contiguous slice of an [`AudioAsset`].
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// Position in the chunk sequence, starting at 0.
    pub index: usize,
    /// Offset of the chunk start within the source asset.
    pub start_offset: f64,
    /// Length of the chunk in seconds.
    pub duration: f64,
    /// Audio file holding this chunk once it has been sliced.
    pub data_ref: Option<PathBuf>,
}

impl Chunk {
    /// End of the chunk within the source asset.
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration
    }
}

/// A unit of recognized speech.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Identifier as produced by the recognizer.
    #[serde(default)]
    pub id: u32,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Recognized text.
    pub text: String,
    /// Speaker label, set only by speaker alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl Segment {
    /// Create an unlabelled segment.
    pub fn new(id: u32, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            id,
            start,
            end,
            text: text.into(),
            speaker: None,
        }
    }

    /// Length of the segment, never negative.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Move the segment forward by `offset` seconds.
    pub fn shift(&mut self, offset: f64) {
        self.start += offset;
        self.end += offset;
    }
}

/// A diarization turn: one speaker talking over an interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Speaker label.
    pub speaker: String,
}

impl SpeakerSegment {
    /// Create a speaker turn.
    pub fn new(start: f64, end: f64, speaker: impl Into<String>) -> Self {
        Self {
            start,
            end,
            speaker: speaker.into(),
        }
    }

    /// Overlap in seconds with the `[start, end)` interval, zero when disjoint.
    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        let overlap_start = self.start.max(start);
        let overlap_end = self.end.min(end);
        if overlap_end > overlap_start {
            overlap_end - overlap_start
        } else {
            0.0
        }
    }
}

/// Output of the diarization stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiarizationResult {
    /// Speaker turns ordered by start time.
    pub segments: Vec<SpeakerSegment>,
    /// Number of distinct speakers.
    pub num_speakers: usize,
}

impl DiarizationResult {
    /// Build a result from raw turns, ordering them by start time and
    /// counting distinct labels.
    pub fn from_segments(mut segments: Vec<SpeakerSegment>) -> Self {
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        let num_speakers = segments
            .iter()
            .map(|s| s.speaker.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        Self {
            segments,
            num_speakers,
        }
    }

    /// Whether no speaker turns were found.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End of the last speaker turn, `0.0` when empty.
    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|s| s.end).fold(0.0, f64::max)
    }
}

/// Convert a raw diarizer label such as `SPEAKER_00` into a 1-indexed label.
///
/// Labels that do not follow the `<prefix>_<number>` shape are returned unchanged.
pub fn normalize_speaker_label(raw: &str) -> String {
    raw.rsplit_once('_')
        .and_then(|(_, n)| n.parse::<u32>().ok())
        .map_or_else(|| raw.to_string(), |n| (n + 1).to_string())
}

/// Aggregated output of the transcription stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Chunk texts joined with a single space.
    pub text: String,
    /// Segments in global time, ordered by chunk then recognizer order.
    pub segments: Vec<Segment>,
    /// Language requested or detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl TranscriptionResult {
    /// Number of whitespace-separated words in the text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
