//! Analysis window functions

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SermoError;

/// Window applied to each STFT frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    Hamming,
    Hann,
    Rectangular,
}

impl WindowFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hamming => "hamming",
            Self::Hann => "hann",
            Self::Rectangular => "rectangular",
        }
    }

    /// Periodic (DFT-even) window of `len` points.
    ///
    /// Periodic rather than symmetric, since the window is used for spectral
    /// analysis and not filter design.
    pub fn coefficients(&self, len: usize) -> Vec<f64> {
        if len == 0 {
            return Vec::new();
        }
        let n = len as f64;
        (0..len)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / n;
                match self {
                    Self::Hamming => 0.54 - 0.46 * phase.cos(),
                    Self::Hann => 0.5 - 0.5 * phase.cos(),
                    Self::Rectangular => 1.0,
                }
            })
            .collect()
    }

    /// Window of `win_length` points, zero-padded on both sides to `n_fft`
    pub fn padded(&self, win_length: usize, n_fft: usize) -> Vec<f64> {
        pad_center(&self.coefficients(win_length), n_fft)
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowFunction {
    type Err = SermoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hamming" => Ok(Self::Hamming),
            "hann" | "hanning" => Ok(Self::Hann),
            "rectangular" | "boxcar" | "ones" => Ok(Self::Rectangular),
            other => Err(SermoError::Config {
                reason: format!("Unknown window function: {}", other),
            }),
        }
    }
}

/// Center `data` inside a zero buffer of `size` points.
///
/// If `data` is already at least `size` long it is returned truncated.
pub fn pad_center(data: &[f64], size: usize) -> Vec<f64> {
    if data.len() >= size {
        return data[..size].to_vec();
    }
    let left = (size - data.len()) / 2;
    let mut out = vec![0.0; size];
    out[left..left + data.len()].copy_from_slice(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_endpoints() {
        let w = WindowFunction::Hamming.coefficients(400);
        assert_eq!(w.len(), 400);
        assert!((w[0] - 0.08).abs() < 1e-12);
        // Periodic window peaks at N/2
        assert!((w[200] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hann_starts_at_zero() {
        let w = WindowFunction::Hann.coefficients(8);
        assert!(w[0].abs() < 1e-12);
        assert!((w[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pad_center() {
        let padded = pad_center(&[1.0, 1.0], 6);
        assert_eq!(padded, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_padded_window_length() {
        let w = WindowFunction::Hamming.padded(400, 1024);
        assert_eq!(w.len(), 1024);
        assert_eq!(w[0], 0.0);
        assert!((w[312] - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Hamming".parse::<WindowFunction>().unwrap(), WindowFunction::Hamming);
        assert_eq!("hanning".parse::<WindowFunction>().unwrap(), WindowFunction::Hann);
        assert!("kaiser".parse::<WindowFunction>().is_err());
    }
}
