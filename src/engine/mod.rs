//! Audio Engine Module
//!
//! Everything between "bytes from a caller" and "canonical samples":
//! - WAV I/O and sample conversions
//! - Container/codec decoding
//! - Normalization to the canonical clip
//! - Scoped scratch files for spooled uploads

pub mod decode;
pub mod io;
pub mod normalizer;
pub mod scratch;
pub mod waveform;

pub use io::{downmix_to_mono, read_wav, resample, write_pcm16_wav, DecodedAudio};
pub use normalizer::{AudioInput, AudioNormalizer};
pub use scratch::ScratchFile;
pub use waveform::{clip_len, Waveform, CANONICAL_SAMPLE_RATE, CLIP_SECONDS};
