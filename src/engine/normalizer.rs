//! Audio normalization
//!
//! Turns whatever the caller hands us (a path, uploaded bytes, raw PCM)
//! into a canonical [`Waveform`]: mono, at the model's sample rate, exactly
//! [`CLIP_SECONDS`](super::waveform::CLIP_SECONDS) long.

use std::path::{Path, PathBuf};

use log::debug;

use super::decode::decode_file;
use super::io::{downmix_to_mono, read_wav, resample, DecodedAudio};
use super::scratch::ScratchFile;
use super::waveform::{clip_len, Waveform};
use crate::error::{Result, SermoError};

/// Audio as supplied by a caller or collaborator
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// An audio file on disk, any supported container
    Path(PathBuf),
    /// An uploaded file body; `file_name` is used as a format hint
    Bytes {
        data: Vec<u8>,
        file_name: Option<String>,
    },
    /// Interleaved PCM already in memory
    Pcm {
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    },
}

impl AudioInput {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        AudioInput::Path(path.into())
    }

    pub fn bytes(data: Vec<u8>, file_name: Option<&str>) -> Self {
        AudioInput::Bytes {
            data,
            file_name: file_name.map(str::to_string),
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        AudioInput::Pcm {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            AudioInput::Path(path) => path.display().to_string(),
            AudioInput::Bytes { data, file_name } => format!(
                "upload {} ({} bytes)",
                file_name.as_deref().unwrap_or("<unnamed>"),
                data.len()
            ),
            AudioInput::Pcm {
                samples,
                sample_rate,
                channels,
            } => format!("pcm {} samples @ {} Hz x{}", samples.len(), sample_rate, channels),
        }
    }
}

/// Converts arbitrary input audio into canonical waveforms
#[derive(Debug, Clone)]
pub struct AudioNormalizer {
    scratch_dir: PathBuf,
}

impl AudioNormalizer {
    /// Create a normalizer that spools uploads into `scratch_dir`
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Normalize `input` to a mono clip at `sample_rate`
    ///
    /// # Errors
    /// * `AudioDecode` - Corrupt data, unsupported codec or an empty stream
    /// * `Io` - The input path cannot be opened, or the upload cannot be spooled
    pub fn normalize(&self, input: &AudioInput, sample_rate: u32) -> Result<Waveform> {
        let decoded = match input {
            AudioInput::Path(path) => decode_path(path)?,
            AudioInput::Bytes { data, file_name } => {
                let scratch = ScratchFile::spool(&self.scratch_dir, file_name.as_deref(), data)?;
                decode_path(scratch.path())?
            }
            AudioInput::Pcm {
                samples,
                sample_rate,
                channels,
            } => DecodedAudio {
                samples: samples.clone(),
                sample_rate: *sample_rate,
                channels: *channels,
            },
        };

        self.conform(decoded, sample_rate)
    }

    /// Downmix, resample and fit already-decoded audio
    pub fn conform(&self, decoded: DecodedAudio, sample_rate: u32) -> Result<Waveform> {
        if decoded.samples.is_empty() {
            return Err(SermoError::AudioDecode {
                reason: "Audio contains no samples".to_string(),
                source: None,
            });
        }
        if decoded.sample_rate == 0 {
            return Err(SermoError::AudioDecode {
                reason: "Audio declares a sample rate of 0 Hz".to_string(),
                source: None,
            });
        }

        let canonical = decoded.channels == 1 && decoded.sample_rate == sample_rate;
        let mono = if decoded.channels == 1 {
            decoded.samples
        } else {
            downmix_to_mono(&decoded.samples, decoded.channels)
        };
        let mono = if decoded.sample_rate == sample_rate {
            mono
        } else {
            // Only the first clip is kept; leave room for the filter kernel
            let mut mono = mono;
            mono.truncate(clip_len(decoded.sample_rate) + decoded.sample_rate as usize / 10);
            resample(&mono, decoded.sample_rate, sample_rate)?
        };

        if !canonical {
            debug!(
                "Converted {} Hz x{} to {} Hz mono",
                decoded.sample_rate, decoded.channels, sample_rate
            );
        }

        Ok(Waveform::canonical(mono, sample_rate))
    }
}

impl Default for AudioNormalizer {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

/// WAV goes straight through hound; other containers, and WAV variants
/// hound cannot parse, are probed by symphonia.
fn decode_path(path: &Path) -> Result<DecodedAudio> {
    if !path.exists() {
        return Err(SermoError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Audio file not found: {}", path.display()),
        )));
    }

    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    if is_wav {
        match read_wav(path) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => debug!("hound rejected {}, probing instead: {}", path.display(), e),
        }
    }

    decode_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::io::write_pcm16_wav;
    use crate::engine::waveform::{clip_len, CANONICAL_SAMPLE_RATE};
    use tempfile::tempdir;

    fn normalizer() -> (tempfile::TempDir, AudioNormalizer) {
        let dir = tempdir().unwrap();
        let normalizer = AudioNormalizer::new(dir.path());
        (dir, normalizer)
    }

    #[test]
    fn test_pcm_short_clip_padded() {
        let (_dir, normalizer) = normalizer();
        let input = AudioInput::mono(vec![0.25; 32_000], CANONICAL_SAMPLE_RATE);

        let wave = normalizer.normalize(&input, CANONICAL_SAMPLE_RATE).unwrap();

        assert_eq!(wave.len(), clip_len(CANONICAL_SAMPLE_RATE));
        assert!(wave.samples()[32_000..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_stereo_is_downmixed_and_resampled() {
        let (_dir, normalizer) = normalizer();
        let input = AudioInput::Pcm {
            samples: vec![0.5; 2 * 8_000],
            sample_rate: 8_000,
            channels: 2,
        };

        let wave = normalizer.normalize(&input, 16_000).unwrap();

        assert_eq!(wave.sample_rate(), 16_000);
        assert_eq!(wave.len(), 48_000);
        // Away from the clip edges the sinc filter passes DC through
        assert!((wave.samples()[8_000] - 0.5).abs() < 1e-2);
        assert_eq!(wave.samples()[20_000], 0.0);
    }

    #[test]
    fn test_long_high_rate_input_is_truncated() {
        let (_dir, normalizer) = normalizer();
        let input = AudioInput::mono(vec![0.25; 48_000 * 10], 48_000);

        let wave = normalizer.normalize(&input, 16_000).unwrap();
        assert_eq!(wave.len(), 48_000);
        assert!((wave.samples()[47_000] - 0.25).abs() < 1e-2);
    }

    #[test]
    fn test_canonical_input_is_unchanged() {
        let (_dir, normalizer) = normalizer();
        let samples: Vec<f32> = (0..48_000).map(|i| ((i % 100) as f32 - 50.0) / 100.0).collect();
        let input = AudioInput::mono(samples.clone(), 16_000);

        let wave = normalizer.normalize(&input, 16_000).unwrap();
        assert_eq!(wave.samples(), samples.as_slice());
    }

    #[test]
    fn test_wav_file_is_read() {
        let (dir, normalizer) = normalizer();
        let path = dir.path().join("clip.wav");
        write_pcm16_wav(&path, &vec![8_192; 16_000], 16_000).unwrap();

        let wave = normalizer.normalize(&AudioInput::path(&path), 16_000).unwrap();
        assert_eq!(wave.len(), 48_000);
        assert!((wave.samples()[0] - 0.25).abs() < 1e-4);
        assert_eq!(wave.samples()[16_000], 0.0);
    }

    #[test]
    fn test_empty_pcm_is_decode_error() {
        let (_dir, normalizer) = normalizer();
        let err = normalizer
            .normalize(&AudioInput::mono(Vec::new(), 16_000), 16_000)
            .unwrap_err();
        assert_eq!(err.error_code(), "AUDIO_DECODE_ERROR");
    }

    #[test]
    fn test_corrupt_upload_leaves_no_scratch_file() {
        let (dir, normalizer) = normalizer();
        let input = AudioInput::bytes(b"RIFF....garbage".to_vec(), Some("clip.wav"));

        let err = normalizer.normalize(&input, 16_000).unwrap_err();

        assert_eq!(err.error_code(), "AUDIO_DECODE_ERROR");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
