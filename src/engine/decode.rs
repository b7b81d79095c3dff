//! Container/codec decoding for non-WAV input
//!
//! Anything that is not a plain WAV file goes through symphonia's probe:
//! the file extension is only a hint, the container is sniffed from the
//! bytes themselves.

use std::fs::File;
use std::path::Path;

use log::debug;
use symphonia::core::{
    audio::SampleBuffer,
    codecs::DecoderOptions,
    errors::Error,
    formats::FormatOptions,
    io::{MediaSource, MediaSourceStream},
    meta::MetadataOptions,
    probe::Hint,
};

use super::io::DecodedAudio;
use crate::error::{Result, SermoError};

/// Decode an audio file of any supported container into interleaved f32
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)?;
    let extension = path.extension().and_then(|ext| ext.to_str());
    decode_source(Box::new(file), extension, &path.display().to_string())
}

fn decode_source(
    source: Box<dyn MediaSource>,
    extension: Option<&str>,
    label: &str,
) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(source, Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SermoError::decode(format!("Unrecognised audio container in {}", label), e))?;
    let mut format = probed.format;
    let track = format.default_track().ok_or_else(|| SermoError::AudioDecode {
        reason: format!("No default audio track in {}", label),
        source: None,
    })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.ok_or_else(|| SermoError::AudioDecode {
        reason: format!("Missing sample rate in {}", label),
        source: None,
    })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| SermoError::decode(format!("Unsupported codec in {}", label), e))?;

    let mut samples = Vec::new();
    let mut channels = codec_params.channels.map(|c| c.count() as u16);
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break,
            Err(Error::ResetRequired) => break,
            Err(e) => {
                return Err(SermoError::decode(
                    format!("Failed to read packet from {}", label),
                    e,
                ))
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            // A single corrupt packet is skipped, not fatal
            Err(Error::DecodeError(reason)) => {
                debug!("Skipping undecodable packet in {}: {}", label, reason);
                continue;
            }
            Err(e) => {
                return Err(SermoError::decode(format!("Failed to decode {}", label), e));
            }
        };
        let spec = *audio_buf.spec();
        channels.get_or_insert(spec.channels.count() as u16);
        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        samples.extend_from_slice(sample_buf.samples());
    }

    let channels = channels.unwrap_or(1).max(1);
    if samples.is_empty() {
        return Err(SermoError::AudioDecode {
            reason: format!("Decoded 0 samples from {}", label),
            source: None,
        });
    }

    debug!(
        "Decoded {}: {} samples, {} Hz, {} channel(s)",
        label,
        samples.len(),
        sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::io::encode_pcm16_wav;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_symphonia_reads_wav_without_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        let mut cursor = Cursor::new(Vec::new());
        let tone: Vec<f32> = (0..8_000).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        encode_pcm16_wav(&mut cursor, &tone, 8_000).unwrap();
        std::fs::write(&path, cursor.into_inner()).unwrap();

        let decoded = decode_file(&path).unwrap();
        assert_eq!(decoded.sample_rate, 8_000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.frames(), 8_000);
    }

    #[test]
    fn test_corrupt_file_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.mp3");
        std::fs::write(&path, b"definitely not an mp3 stream").unwrap();

        let err = decode_file(&path).unwrap_err();
        assert_eq!(err.error_code(), "AUDIO_DECODE_ERROR");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = decode_file(Path::new("/nonexistent/clip.ogg")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
