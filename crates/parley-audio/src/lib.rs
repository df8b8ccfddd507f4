//! # parley-audio
//!
//! Everything that touches audio bytes before a model sees them:
//!
//! - [`source`]: resolving upload / URL / base64 payloads and writing them to disk
//! - [`decode`]: decoding any supported container to 16 kHz mono `f32`
//! - [`normalize`]: [`SymphoniaNormalizer`], the canonical-format [`AudioNormalizer`]
//! - [`slice`]: [`WavSlicer`], writing one WAV per planned chunk
//!
//! [`AudioNormalizer`]: parley_core::AudioNormalizer

#![deny(unsafe_code)]

pub mod decode;
pub mod errors;
pub mod normalize;
pub mod slice;
pub mod source;
pub mod wav;

pub use decode::TARGET_SAMPLE_RATE;
pub use errors::AudioError;
pub use normalize::SymphoniaNormalizer;
pub use slice::WavSlicer;
pub use source::{AudioSource, normalize_base64};
