//! Mel-frequency cepstral coefficients
//!
//! Pipeline: centred STFT power spectrum -> mel filterbank -> dB -> DCT-II
//! (orthonormal), truncated to the first `n_mfcc` coefficients.

use std::f64::consts::PI;

use ndarray::Array2;

use super::mel::{mel_filterbank, power_to_db};
use super::stft::power_spectrogram;
use super::window::WindowFunction;

/// Parameters for a single MFCC computation
#[derive(Debug, Clone, PartialEq)]
pub struct MfccParams {
    pub sample_rate: u32,
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
    pub window: WindowFunction,
    pub n_mels: usize,
    pub f_min: f64,
    pub f_max: f64,
}

/// Compute MFCCs with shape `(n_mfcc, frames)`
pub fn mfcc(samples: &[f32], params: &MfccParams) -> Array2<f64> {
    let window = params.window.padded(params.win_length, params.n_fft);
    let power = power_spectrogram(samples, params.n_fft, params.hop_length, &window);

    let filters = mel_filterbank(
        params.sample_rate,
        params.n_fft,
        params.n_mels,
        params.f_min,
        params.f_max,
    );
    let mut mel = filters.dot(&power);
    power_to_db(&mut mel);

    dct_matrix(params.n_mfcc, params.n_mels).dot(&mel)
}

/// Orthonormal DCT-II basis with shape `(n_out, n_in)`
///
/// Row `k` is `sqrt(2 / N) * cos(pi * k * (2n + 1) / 2N)`, with row 0 scaled
/// by `sqrt(1 / N)` instead.
pub fn dct_matrix(n_out: usize, n_in: usize) -> Array2<f64> {
    let n = n_in.max(1) as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 {
            (1.0 / n).sqrt()
        } else {
            (2.0 / n).sqrt()
        };
        scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()
    })
}
