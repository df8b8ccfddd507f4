//! Serverless job input parsing.

use parley_audio::{AudioError, AudioSource};
use parley_core::{DiarizationResult, JobError, SpeakerSegment};
use parley_pipeline::{ResponseFormat, TranscriptionRequest};
use serde::Deserialize;
use serde_json::Value;

fn default_true() -> bool {
    true
}

/// Fields shared by every `/runsync` job.
#[derive(Debug, Deserialize)]
struct TranscriptionJobInput {
    audio: Option<String>,
    audio_format: Option<String>,
    language: Option<String>,
    response_format: Option<String>,
    #[serde(default)]
    timestamps: bool,
    #[serde(default)]
    word_timestamps: bool,
    #[serde(default = "default_true")]
    diarize: bool,
    #[serde(default)]
    temperature: f32,
    num_speakers: Option<u32>,
    diarization_segments: Option<Vec<SpeakerSegment>>,
}

/// Input of a diarization job.
#[derive(Debug, Deserialize)]
struct DiarizationJobInput {
    audio: Option<String>,
    audio_format: Option<String>,
    num_speakers: Option<u32>,
}

fn invalid(err: &serde_json::Error) -> JobError {
    JobError::input(format!("Invalid job input: {err}"))
}

fn source_error(err: AudioError) -> JobError {
    JobError::input(err.to_string())
}

/// Parse a transcription job's `input` object.
///
/// `diarization_segments` from an upstream worker are normalised into a
/// [`DiarizationResult`]; an empty list means no diarization.
pub fn parse_transcription_input(input: Value) -> Result<TranscriptionRequest, JobError> {
    let input: TranscriptionJobInput = serde_json::from_value(input).map_err(|e| invalid(&e))?;
    let source = AudioSource::from_job_fields(input.audio.as_deref(), input.audio_format.as_deref())
        .map_err(source_error)?;

    let response_format = match input.response_format.as_deref() {
        Some(f) => f.parse::<ResponseFormat>()?,
        None => ResponseFormat::Json,
    };

    let mut request = TranscriptionRequest::new(source);
    request.language = input.language;
    request.response_format = response_format;
    request.timestamps = input.timestamps;
    request.word_timestamps = input.word_timestamps;
    request.diarize = input.diarize;
    request.temperature = input.temperature;
    request.num_speakers = input.num_speakers;
    request.diarization_segments = input
        .diarization_segments
        .filter(|s| !s.is_empty())
        .map(DiarizationResult::from_segments);
    Ok(request)
}

/// Parse a diarization job's `input` object.
pub fn parse_diarization_input(input: Value) -> Result<(AudioSource, Option<u32>), JobError> {
    let input: DiarizationJobInput = serde_json::from_value(input).map_err(|e| invalid(&e))?;
    let source = AudioSource::from_job_fields(input.audio.as_deref(), input.audio_format.as_deref())
        .map_err(source_error)?;
    Ok((source, input.num_speakers))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn url_input_with_defaults() {
        let req = parse_transcription_input(json!({"audio": "https://x.test/a.mp3"})).unwrap();
        assert_eq!(req.source, AudioSource::Url("https://x.test/a.mp3".into()));
        assert_eq!(req.response_format, ResponseFormat::Json);
        assert!(req.diarize);
        assert!(!req.timestamps);
        assert!(req.diarization_segments.is_none());
    }

    #[test]
    fn forwarded_segments_are_sorted() {
        let req = parse_transcription_input(json!({
            "audio": "AAAA",
            "audio_format": "wav",
            "timestamps": true,
            "diarization_segments": [
                {"start": 2.0, "end": 3.0, "speaker": "2"},
                {"start": 0.0, "end": 2.0, "speaker": "1"}
            ]
        }))
        .unwrap();
        let d = req.diarization_segments.unwrap();
        assert_eq!(d.num_speakers, 2);
        assert_eq!(d.segments[0].speaker, "1");
    }

    #[test]
    fn orchestrated_payload_disables_local_diarization() {
        let req = parse_transcription_input(json!({
            "audio": "https://x.test/a.wav",
            "audio_format": null,
            "language": null,
            "response_format": "json",
            "timestamps": false,
            "word_timestamps": false,
            "temperature": 0.0,
            "diarize": false
        }))
        .unwrap();
        assert!(!req.diarize);
        assert!(req.diarization_segments.is_none());
    }

    #[test]
    fn empty_forwarded_segments_mean_none() {
        let req = parse_transcription_input(json!({
            "audio": "https://x.test/a.wav",
            "diarization_segments": []
        }))
        .unwrap();
        assert!(req.diarization_segments.is_none());
    }

    #[test]
    fn base64_without_format_is_rejected() {
        let err = parse_transcription_input(json!({"audio": "AAAA"})).unwrap_err();
        assert_matches!(err, JobError::Input { ref message } if message.contains("audio_format"));
    }

    #[test]
    fn missing_audio_is_rejected() {
        let err = parse_transcription_input(json!({})).unwrap_err();
        assert_eq!(err.to_string(), "No audio input provided");
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let err =
            parse_transcription_input(json!({"audio": "https://x/a", "response_format": "xml"}))
                .unwrap_err();
        assert!(err.to_string().starts_with("Unsupported response format: xml"));
    }

    #[test]
    fn wrong_field_type_is_input_error() {
        let err = parse_transcription_input(json!({"audio": "https://x/a", "timestamps": "yes"}))
            .unwrap_err();
        assert_matches!(err, JobError::Input { .. });
    }

    #[test]
    fn diarization_input() {
        let (source, n) =
            parse_diarization_input(json!({"audio": "https://x/a.wav", "num_speakers": 3})).unwrap();
        assert_eq!(source.kind(), "url");
        assert_eq!(n, Some(3));
    }
}
