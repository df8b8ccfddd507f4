//! End-to-end local jobs with real audio handling and scripted models.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use parking_lot::Mutex;
use parley_audio::{AudioSource, SymphoniaNormalizer, WavSlicer};
use parley_core::{
    AsrOptions, ChunkTranscript, CollaboratorError, CpuAccelerator, DiarizationResult, Diarizer,
    JobError, Segment, SpeakerSegment, SpeechRecognizer, Stage,
};
use parley_pipeline::{
    JobConfig, LocalJobRunner, ModelServices, RenderedOutput, ResponseFormat, TranscriptionRequest,
};

type Log = Arc<Mutex<Vec<String>>>;

struct ChunkNameRecognizer {
    log: Log,
    fail: bool,
}

#[async_trait]
impl SpeechRecognizer for ChunkNameRecognizer {
    async fn transcribe(
        &self,
        chunk: &Path,
        _options: &AsrOptions,
    ) -> Result<ChunkTranscript, CollaboratorError> {
        let name = chunk.file_stem().unwrap().to_string_lossy().into_owned();
        self.log.lock().push(format!("transcribe:{name}"));
        if self.fail {
            return Err(CollaboratorError::Inference("CUDA out of memory".into()));
        }
        Ok(ChunkTranscript {
            text: name.clone(),
            segments: vec![Segment::new(0, 0.5, 1.5, name)],
        })
    }

    fn model_id(&self) -> &str {
        "chunk-name"
    }
}

struct TwoSpeakers {
    log: Log,
}

#[async_trait]
impl Diarizer for TwoSpeakers {
    async fn diarize(
        &self,
        _audio: &Path,
        _num_speakers: Option<u32>,
    ) -> Result<DiarizationResult, CollaboratorError> {
        self.log.lock().push("diarize".into());
        Ok(DiarizationResult::from_segments(vec![
            SpeakerSegment::new(0.0, 2.5, "1"),
            SpeakerSegment::new(2.5, 5.0, "2"),
        ]))
    }

    async fn release(&self) -> Result<(), CollaboratorError> {
        self.log.lock().push("release".into());
        Ok(())
    }
}

fn wav_bytes(seconds: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..seconds * 16_000 {
            writer.write_sample(((i % 64) as i16 - 32) * 100).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

struct Harness {
    runner: LocalJobRunner,
    log: Log,
    temp: tempfile::TempDir,
}

fn harness(with_diarizer: bool, recognizer_fails: bool, loaded: bool) -> Harness {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let diarizer = with_diarizer.then(|| {
        Arc::new(TwoSpeakers {
            log: Arc::clone(&log),
        }) as Arc<dyn Diarizer>
    });
    let services = ModelServices::new("chunk-name", Arc::new(CpuAccelerator), diarizer);
    if loaded {
        services.install_recognizer(Arc::new(ChunkNameRecognizer {
            log: Arc::clone(&log),
            fail: recognizer_fails,
        }));
    }

    let temp = tempfile::tempdir().unwrap();
    let runner = LocalJobRunner::new(
        Arc::new(services),
        Arc::new(SymphoniaNormalizer),
        Arc::new(WavSlicer),
        reqwest::Client::new(),
        JobConfig {
            temp_dir: temp.path().to_path_buf(),
            chunk_duration: 2.0,
            download_timeout: Duration::from_secs(5),
            model_name: "parakeet-tdt-0.6b-v2".into(),
        },
    );
    Harness { runner, log, temp }
}

fn upload(seconds: u32) -> TranscriptionRequest {
    TranscriptionRequest::new(AudioSource::Upload {
        bytes: wav_bytes(seconds),
        filename: Some("meeting.wav".into()),
    })
}

fn scratch_is_empty(h: &Harness) -> bool {
    std::fs::read_dir(h.temp.path()).unwrap().next().is_none()
}

#[tokio::test]
async fn diarized_job_labels_segments_in_global_time() {
    let h = harness(true, false, true);
    let mut request = upload(5);
    request.response_format = ResponseFormat::VerboseJson;

    let RenderedOutput::Json(body) = h.runner.run(request).await.unwrap() else {
        panic!("expected json");
    };

    assert_eq!(body["text"], "chunk_0000 chunk_0001 chunk_0002");
    let segments = body["segments"].as_array().unwrap();
    let spans: Vec<(f64, f64, &str)> = segments
        .iter()
        .map(|s| {
            (
                s["start"].as_f64().unwrap(),
                s["end"].as_f64().unwrap(),
                s["speaker"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        spans,
        vec![(0.5, 1.5, "1"), (2.5, 3.5, "2"), (4.5, 5.5, "2")]
    );
    assert_eq!(body["model"], "parakeet-tdt-0.6b-v2");

    let log = h.log.lock().clone();
    assert_eq!(&log[..2], &["diarize".to_string(), "release".to_string()]);
    assert!(scratch_is_empty(&h));
}

#[tokio::test]
async fn job_without_diarizer_has_no_speakers() {
    let h = harness(false, false, true);
    let mut request = upload(3);
    request.timestamps = true;

    let RenderedOutput::Json(body) = h.runner.run(request).await.unwrap() else {
        panic!("expected json");
    };
    let segments = body["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 2);
    assert!(segments.iter().all(|s| s.get("speaker").is_none()));
}

#[tokio::test]
async fn forwarded_segments_skip_local_diarization() {
    let h = harness(true, false, true);
    let mut request = upload(2);
    request.diarize = false;
    request.diarization_segments = Some(DiarizationResult::from_segments(vec![
        SpeakerSegment::new(0.0, 2.0, "7"),
    ]));

    let RenderedOutput::Json(body) = h.runner.run(request).await.unwrap() else {
        panic!("expected json");
    };
    assert_eq!(body["segments"][0]["speaker"], "7");
    assert!(!h.log.lock().iter().any(|e| e == "diarize"));
}

#[tokio::test]
async fn diarize_false_never_touches_configured_diarizer() {
    let h = harness(true, false, true);
    let mut request = upload(2);
    request.diarize = false;
    request.timestamps = true;

    let RenderedOutput::Json(body) = h.runner.run(request).await.unwrap() else {
        panic!("expected json");
    };
    assert!(body["segments"].as_array().unwrap().iter().all(|s| s.get("speaker").is_none()));
    assert!(!h.log.lock().iter().any(|e| e == "diarize"));
}

#[tokio::test]
async fn srt_output_is_text() {
    let h = harness(false, false, true);
    let mut request = upload(1);
    request.response_format = ResponseFormat::Srt;

    let out = h.runner.run(request).await.unwrap();
    assert_matches!(out, RenderedOutput::Text(ref t) if t.starts_with("1\n00:00:00,500 --> 00:00:01,500\n"));
}

#[tokio::test]
async fn transcription_failure_is_hard_and_cleans_up() {
    let h = harness(true, true, true);
    let err = h.runner.run(upload(3)).await.unwrap_err();
    assert_matches!(err, JobError::Stage { stage: Stage::Transcription, .. });
    assert!(scratch_is_empty(&h));
}

#[tokio::test]
async fn unloaded_model_is_unavailable() {
    let h = harness(false, false, false);
    let err = h.runner.run(upload(1)).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(scratch_is_empty(&h));
}

#[tokio::test]
async fn bad_base64_is_input_error() {
    let h = harness(false, false, true);
    let request = TranscriptionRequest::new(AudioSource::Base64 {
        data: "%%%".into(),
        format: "wav".into(),
    });
    let err = h.runner.run(request).await.unwrap_err();
    assert_matches!(err, JobError::Input { .. });
    assert!(scratch_is_empty(&h));
}

#[tokio::test]
async fn undecodable_audio_is_normalization_failure() {
    let h = harness(false, false, true);
    let request = TranscriptionRequest::new(AudioSource::Upload {
        bytes: b"definitely not audio".to_vec(),
        filename: Some("x.wav".into()),
    });
    let err = h.runner.run(request).await.unwrap_err();
    assert_matches!(err, JobError::Stage { stage: Stage::Normalization, .. });
    assert!(scratch_is_empty(&h));
}

#[tokio::test]
async fn json_without_timestamps_is_text_only() {
    let h = harness(false, false, true);
    let RenderedOutput::Json(body) = h.runner.run(upload(1)).await.unwrap() else {
        panic!("expected json");
    };
    // A single-chunk plan transcribes the normalised asset directly.
    assert_eq!(body, serde_json::json!({"text": "normalized"}));
}
