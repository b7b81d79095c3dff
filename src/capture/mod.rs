//! Remote device capture
//!
//! A microphone device streams raw 16-bit little-endian mono PCM at 16 kHz
//! over TCP as soon as a client connects. [`DeviceCapture`] reads a fixed
//! number of seconds from it and hands the clip to the inference pipeline.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::engine::io::i16_to_f32;
use crate::engine::{write_pcm16_wav, AudioInput};
use crate::error::{Result, SermoError};

pub const DEVICE_SAMPLE_RATE: u32 = 16_000;
pub const DEVICE_SAMPLE_WIDTH: usize = 2;
pub const CHUNK_SIZE: usize = 4096;

/// Bytes a complete capture of `duration_secs` should deliver
pub fn expected_bytes(duration_secs: u32) -> usize {
    DEVICE_SAMPLE_RATE as usize * DEVICE_SAMPLE_WIDTH * duration_secs as usize
}

// ============================================================================
// Captured clip
// ============================================================================

/// Audio received from the device
#[derive(Debug, Clone)]
pub struct CapturedClip {
    samples: Vec<i16>,
    expected_bytes: usize,
    received_bytes: usize,
}

impl CapturedClip {
    /// Decode a little-endian PCM byte stream; a trailing odd byte is dropped
    pub fn from_le_bytes(bytes: &[u8], expected_bytes: usize) -> Self {
        let samples = bytes
            .chunks_exact(DEVICE_SAMPLE_WIDTH)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self {
            samples,
            expected_bytes,
            received_bytes: bytes.len(),
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn received_bytes(&self) -> usize {
        self.received_bytes
    }

    pub fn expected_bytes(&self) -> usize {
        self.expected_bytes
    }

    /// False when the device closed the stream early
    pub fn is_complete(&self) -> bool {
        self.received_bytes >= self.expected_bytes
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / DEVICE_SAMPLE_RATE as f64
    }

    /// In-memory input for the inference pipeline
    pub fn to_input(&self) -> AudioInput {
        let samples = self.samples.iter().copied().map(i16_to_f32).collect();
        AudioInput::mono(samples, DEVICE_SAMPLE_RATE)
    }

    /// Write the clip as `capture_<unix-seconds>.wav` under `dir`
    pub fn archive(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("capture_{}.wav", chrono::Utc::now().timestamp()));
        write_pcm16_wav(&path, &self.samples, DEVICE_SAMPLE_RATE)?;
        info!("Archived capture to {}", path.display());
        Ok(path)
    }
}

// ============================================================================
// Device connection
// ============================================================================

/// Pulls fixed-length clips from a streaming microphone
#[derive(Debug, Clone)]
pub struct DeviceCapture {
    addr: String,
    grace: Duration,
}

impl DeviceCapture {
    /// Capture from `addr` (`host:port`), allowing `grace` beyond the clip
    /// duration before giving up
    pub fn new(addr: impl Into<String>, grace: Duration) -> Self {
        Self {
            addr: addr.into(),
            grace,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Record `duration_secs` of audio
    ///
    /// # Errors
    /// * `Config` - If the address does not resolve
    /// * `CaptureTimeout` - If the connection or the stream outlives
    ///   `duration_secs + grace`
    /// * `Io` - If the connection is refused or reset
    pub fn capture(&self, duration_secs: u32) -> Result<CapturedClip> {
        let expected = expected_bytes(duration_secs);
        let deadline = Instant::now() + Duration::from_secs(duration_secs as u64) + self.grace;
        let timeout = |received: usize| SermoError::CaptureTimeout {
            expected_bytes: expected,
            received_bytes: received,
        };

        let addr = self.resolve()?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let mut stream = TcpStream::connect_timeout(&addr, remaining).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => timeout(0),
            _ => SermoError::Io(e),
        })?;
        info!("Connected to capture device at {}", addr);

        let mut bytes = Vec::with_capacity(expected);
        let mut chunk = [0u8; CHUNK_SIZE];
        while bytes.len() < expected {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timeout(bytes.len()));
            }
            stream.set_read_timeout(Some(remaining))?;

            let want = CHUNK_SIZE.min(expected - bytes.len());
            match stream.read(&mut chunk[..want]) {
                Ok(0) => {
                    warn!(
                        "Device closed stream after {} of {} bytes",
                        bytes.len(),
                        expected
                    );
                    break;
                }
                Ok(n) => {
                    bytes.extend_from_slice(&chunk[..n]);
                    debug!("Received {} bytes, {} / {}", n, bytes.len(), expected);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Err(timeout(bytes.len()));
                }
                Err(e) => return Err(SermoError::Io(e)),
            }
        }

        Ok(CapturedClip::from_le_bytes(&bytes, expected))
    }

    fn resolve(&self) -> Result<SocketAddr> {
        self.addr
            .to_socket_addrs()
            .map_err(|e| SermoError::Config {
                reason: format!("cannot resolve device address '{}': {}", self.addr, e),
            })?
            .next()
            .ok_or_else(|| SermoError::Config {
                reason: format!("device address '{}' resolved to nothing", self.addr),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    fn serve(payload: Vec<u8>, hold_open: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            for chunk in payload.chunks(1000) {
                if socket.write_all(chunk).is_err() {
                    return;
                }
            }
            thread::sleep(hold_open);
        });
        addr
    }

    #[test]
    fn test_expected_bytes() {
        assert_eq!(expected_bytes(6), 192_000);
        assert_eq!(expected_bytes(1), 32_000);
    }

    #[test]
    fn test_full_capture() {
        let payload: Vec<u8> = (0..16_000i16).flat_map(|s| s.to_le_bytes()).collect();
        let addr = serve(payload, Duration::from_millis(0));

        let clip = DeviceCapture::new(addr, Duration::from_secs(5)).capture(1).unwrap();
        assert!(clip.is_complete());
        assert_eq!(clip.samples().len(), 16_000);
        assert_eq!(clip.samples()[1234], 1234);
    }

    #[test]
    fn test_early_close_returns_partial_clip() {
        let addr = serve(vec![0u8; 10_001], Duration::from_millis(0));

        let clip = DeviceCapture::new(addr, Duration::from_secs(5)).capture(1).unwrap();
        assert!(!clip.is_complete());
        assert_eq!(clip.received_bytes(), 10_001);
        assert_eq!(clip.samples().len(), 5_000);
    }

    #[test]
    fn test_stalled_device_times_out() {
        let addr = serve(vec![0u8; 2_000], Duration::from_secs(3));
        let err = DeviceCapture::new(addr, Duration::from_millis(200))
            .capture(1)
            .unwrap_err();
        match err {
            SermoError::CaptureTimeout {
                expected_bytes,
                received_bytes,
            } => {
                assert_eq!(expected_bytes, 32_000);
                assert_eq!(received_bytes, 2_000);
            }
            other => panic!("expected capture timeout, got {}", other),
        }
    }

    #[test]
    fn test_archive_writes_wav() {
        let dir = tempfile::tempdir().unwrap();
        let clip = CapturedClip::from_le_bytes(&[0x10, 0x00, 0xF0, 0xFF], 4);

        let path = clip.archive(dir.path()).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("capture_"));

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![16, -16]);
    }
}
