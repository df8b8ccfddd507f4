//! Audio decoding and resampling to 16kHz mono f32.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::errors::AudioError;

/// Sample rate of every normalised asset.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Decode an audio file into 16kHz mono f32 samples.
///
/// The container is probed by content, with the file extension as a hint.
/// Returns the samples and the source sample rate.
pub fn decode_file(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let _ = hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("probe failed: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Decode("no audio track found".into()))?;

    let codec_params = track.codec_params.clone();
    let track_id = track.id;
    let source_rate = codec_params.sample_rate.unwrap_or(TARGET_SAMPLE_RATE);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("codec init failed: {e}")))?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(format!("packet read: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt frame; keep going.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(AudioError::Decode(format!("decode: {e}"))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let samples = sample_buf.samples();

        if channels > 1 {
            for frame in samples.chunks(channels) {
                mono.push(frame.iter().sum::<f32>() / channels as f32);
            }
        } else {
            mono.extend_from_slice(samples);
        }
    }

    if mono.is_empty() {
        return Err(AudioError::Decode("no audio samples decoded".into()));
    }

    if source_rate != TARGET_SAMPLE_RATE {
        mono = resample(&mono, source_rate, TARGET_SAMPLE_RATE)?;
    }

    Ok((mono, source_rate))
}

/// Resample mono audio from `from_rate` to `to_rate` using rubato.
///
/// The output is trimmed to the exact expected length so durations computed
/// from the sample count stay faithful to the source.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| AudioError::Resample(format!("init: {e}")))?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected + chunk_size);

    for chunk in samples.chunks(chunk_size) {
        let mut block = chunk.to_vec();
        block.resize(chunk_size, 0.0);

        let resampled = resampler
            .process(&[block], None)
            .map_err(|e| AudioError::Resample(format!("process: {e}")))?;

        if let Some(channel) = resampled.first() {
            output.extend_from_slice(channel);
        }
    }

    output.resize(expected, 0.0);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_pcm16(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * u32::from(channels) {
            writer.write_sample(((i % 100) as i16) * 50).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decode_invalid_audio_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        std::fs::write(&path, b"not audio data").unwrap();
        assert!(decode_file(&path).is_err());
    }

    #[test]
    fn decode_missing_file_is_io_error() {
        let result = decode_file(Path::new("/nonexistent/input.wav"));
        assert!(matches!(result, Err(AudioError::Io(_))));
    }

    #[test]
    fn decode_16khz_mono_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.wav");
        write_pcm16(&path, 16_000, 1, 1600);

        let (samples, rate) = decode_file(&path).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(samples.len(), 1600);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn decode_44khz_stereo_resamples_to_16khz_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.wav");
        write_pcm16(&path, 44_100, 2, 22_050);

        let (samples, rate) = decode_file(&path).unwrap();
        assert_eq!(rate, 44_100);
        // 0.5s at 16kHz
        assert_eq!(samples.len(), 8000);
    }

    #[test]
    fn resample_downsample_ratio() {
        let samples: Vec<f32> = (0..48_000).map(|i| (i as f32 / 48_000.0).sin()).collect();
        let result = resample(&samples, 48_000, 16_000).unwrap();
        assert_eq!(result.len(), 16_000);
    }

    #[test]
    fn resample_identity_copies() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16_000, 16_000).unwrap(), samples);
    }
}
