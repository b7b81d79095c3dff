//! WAV file I/O and sample-level conversions
//!
//! WAV is the fast path: it is read directly with `hound` and never goes
//! through the generic container probe. Everything here works on
//! interleaved f32 samples in the range [-1.0, 1.0].
//!
//! Sample rate conversion is band-limited (windowed sinc), so content above
//! the target Nyquist is filtered out rather than aliased into the band.

use std::io::{Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction as SincWindow,
};

use crate::error::{Result, SermoError};

/// Interleaved samples as they came out of a decoder
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Read a WAV file into interleaved f32 samples
///
/// # Errors
/// * `AudioDecode` - If the file is not a readable WAV file
pub fn read_wav(path: &Path) -> Result<DecodedAudio> {
    let reader = WavReader::open(path)
        .map_err(|e| SermoError::decode(format!("Failed to open WAV file {}", path.display()), e))?;
    read_wav_from(reader)
}

/// Read WAV data from any reader
pub fn read_wav_reader<R: Read>(reader: R) -> Result<DecodedAudio> {
    let reader =
        WavReader::new(reader).map_err(|e| SermoError::decode("Failed to parse WAV header", e))?;
    read_wav_from(reader)
}

fn read_wav_from<R: Read>(reader: WavReader<R>) -> Result<DecodedAudio> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(SermoError::AudioDecode {
            reason: "WAV header declares zero channels".to_string(),
            source: None,
        });
    }
    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Write mono 16-bit PCM to a WAV file
pub fn write_pcm16_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = pcm16_spec(sample_rate);
    let mut writer = WavWriter::create(path, spec).map_err(hound_to_io)?;
    for &sample in samples {
        writer.write_sample(sample).map_err(hound_to_io)?;
    }
    writer.finalize().map_err(hound_to_io)?;
    Ok(())
}

/// Write mono f32 samples as 16-bit PCM WAV into any seekable writer
pub fn encode_pcm16_wav<W: Write + Seek>(writer: W, samples: &[f32], sample_rate: u32) -> Result<()> {
    let mut writer = WavWriter::new(writer, pcm16_spec(sample_rate)).map_err(hound_to_io)?;
    for &sample in samples {
        writer.write_sample(f32_to_i16(sample)).map_err(hound_to_io)?;
    }
    writer.finalize().map_err(hound_to_io)?;
    Ok(())
}

fn pcm16_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn hound_to_io(e: hound::Error) -> SermoError {
    match e {
        hound::Error::IoError(io) => SermoError::Io(io),
        other => SermoError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

// ============================================================================
// Sample conversions
// ============================================================================

/// Convert a signed 16-bit sample to f32 in [-1.0, 1.0)
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Convert an f32 sample to signed 16-bit, clamping out-of-range input
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Average interleaved channels down to a single mono channel
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Sinc kernel length in taps
const SINC_LEN: usize = 256;
/// Anti-alias cutoff relative to the lower of the two Nyquist rates
const SINC_CUTOFF: f32 = 0.95;

/// Resample a mono signal to a different sample rate
///
/// The output holds `ceil(len * target / source)` samples, aligned with the
/// input (the filter delay is removed).
///
/// # Errors
/// * `AudioDecode` - If the resampler rejects the rate pair
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if source_rate == target_rate || source_rate == 0 || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let target_len =
        (samples.len() as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;
    let ratio = target_rate as f64 / source_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: SINC_CUTOFF,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: SincWindow::BlackmanHarris2,
    };
    let rates = || format!("{} Hz to {} Hz", source_rate, target_rate);

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, samples.len(), 1)
        .map_err(|e| SermoError::decode(format!("Cannot resample {}", rates()), e))?;
    let delay = resampler.output_delay();

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| SermoError::decode(format!("Resampling {} failed", rates()), e))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Flush the filter tail with silence
    while output.len() < delay + target_len {
        let tail = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| SermoError::decode(format!("Resampling {} failed", rates()), e))?
            .into_iter()
            .next()
            .unwrap_or_default();
        if tail.is_empty() {
            break;
        }
        output.extend(tail);
    }

    output.drain(..delay.min(output.len()));
    output.resize(target_len, 0.0);
    Ok(output)
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| SermoError::decode("Failed to read float samples", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| SermoError::decode("Failed to read 8-bit samples", e)),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(i16_to_f32))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| SermoError::decode("Failed to read 16-bit samples", e)),
            24 => {
                // 24-bit stored as i32 in hound
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / 8388608.0))
                    .collect::<std::result::Result<Vec<f32>, _>>()
                    .map_err(|e| SermoError::decode("Failed to read 24-bit samples", e))
            }
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| SermoError::decode("Failed to read 32-bit int samples", e)),
            other => Err(SermoError::AudioDecode {
                reason: format!("{}-bit integer WAV is not supported", other),
                source: None,
            }),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_downmix_averages_channels() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let mono = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&mono, 1), mono);
    }

    fn sine(frequency: f64, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * frequency * i as f64 / sample_rate as f64).sin() as f32)
            .collect()
    }

    /// RMS over the middle half, away from edge transients
    fn mid_rms(samples: &[f32]) -> f32 {
        let mid = &samples[samples.len() / 4..samples.len() * 3 / 4];
        (mid.iter().map(|s| s * s).sum::<f32>() / mid.len() as f32).sqrt()
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.1, -0.2, 0.3];
        assert_eq!(resample(&samples, 16_000, 16_000).unwrap(), samples);
    }

    #[test]
    fn test_resample_length() {
        let out = resample(&vec![0.0_f32; 44_100], 44_100, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);

        let out = resample(&vec![0.0_f32; 8_000], 8_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);

        let out = resample(&vec![0.0_f32; 1_001], 48_000, 16_000).unwrap();
        assert_eq!(out.len(), 334);
    }

    #[test]
    fn test_resample_keeps_in_band_tone() {
        let out = resample(&sine(1_000.0, 44_100, 44_100), 44_100, 16_000).unwrap();
        assert!((mid_rms(&out) - 0.707).abs() < 0.02, "rms {}", mid_rms(&out));

        // Aligned with the input: a 1 kHz sine at 16 kHz, phase zero
        let expected = sine(1_000.0, 16_000, out.len());
        let i = out.len() / 2;
        assert!((out[i] - expected[i]).abs() < 0.02);
    }

    #[test]
    fn test_resample_rejects_tone_above_nyquist() {
        // 12 kHz would alias to 4 kHz at a 16 kHz rate
        let out = resample(&sine(12_000.0, 44_100, 44_100), 44_100, 16_000).unwrap();
        assert!(mid_rms(&out) < 0.01, "aliased rms {}", mid_rms(&out));
    }

    #[test]
    fn test_pcm16_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let samples: Vec<i16> = vec![0, 16_384, -16_384, 32_767];

        write_pcm16_wav(&path, &samples, 16_000).unwrap();
        let decoded = read_wav(&path).unwrap();

        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.frames(), 4);
        assert!((decoded.samples[1] - 0.5).abs() < 1e-4);
        assert!((decoded.samples[2] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_encode_in_memory() {
        let mut cursor = Cursor::new(Vec::new());
        encode_pcm16_wav(&mut cursor, &[0.25, -0.25], 8_000).unwrap();

        let bytes = cursor.into_inner();
        let decoded = read_wav_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(decoded.sample_rate, 8_000);
        assert_eq!(decoded.samples.len(), 2);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = read_wav_reader(Cursor::new(b"not a wav file at all".to_vec())).unwrap_err();
        assert_eq!(err.error_code(), "AUDIO_DECODE_ERROR");
    }
}
