//! Short-time Fourier transform
//!
//! Frames are centred: the signal is zero-padded by `n_fft / 2` on both
//! sides, so frame `t` is centred on sample `t * hop_length` and a signal
//! of `n` samples yields `1 + n / hop_length` frames.

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

/// Number of frames a centred STFT produces for `num_samples` samples
pub fn frame_count(num_samples: usize, n_fft: usize, hop_length: usize) -> usize {
    let padded = num_samples + 2 * (n_fft / 2);
    if padded < n_fft || hop_length == 0 {
        return 0;
    }
    1 + (padded - n_fft) / hop_length
}

/// Power spectrogram `|X|^2` with shape `(n_fft / 2 + 1, frames)`
///
/// `window` must be `n_fft` points long (see
/// [`WindowFunction::padded`](super::window::WindowFunction::padded)).
pub fn power_spectrogram(
    samples: &[f32],
    n_fft: usize,
    hop_length: usize,
    window: &[f64],
) -> Array2<f64> {
    debug_assert_eq!(window.len(), n_fft);

    let bins = n_fft / 2 + 1;
    let frames = frame_count(samples.len(), n_fft, hop_length);
    let mut spec = Array2::<f64>::zeros((bins, frames));
    if frames == 0 {
        return spec;
    }

    let pad = n_fft / 2;
    let mut padded = vec![0.0_f64; samples.len() + 2 * pad];
    for (dst, &src) in padded[pad..pad + samples.len()].iter_mut().zip(samples) {
        *dst = if src.is_finite() { src as f64 } else { 0.0 };
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];
    let mut scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

    for t in 0..frames {
        let start = t * hop_length;
        let frame = &padded[start..start + n_fft];
        for ((cell, &x), &w) in buffer.iter_mut().zip(frame).zip(window) {
            *cell = Complex::new(x * w, 0.0);
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (bin, value) in buffer.iter().take(bins).enumerate() {
            spec[[bin, t]] = value.norm_sqr();
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::window::WindowFunction;

    #[test]
    fn test_frame_count_for_three_seconds() {
        assert_eq!(frame_count(48_000, 2048, 160), 301);
        assert_eq!(frame_count(48_000, 1024, 160), 301);
    }

    #[test]
    fn test_silence_has_zero_power() {
        let window = WindowFunction::Hamming.padded(400, 1024);
        let spec = power_spectrogram(&vec![0.0; 16_000], 1024, 160, &window);
        assert_eq!(spec.dim(), (513, 101));
        assert!(spec.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let sr = 16_000.0;
        let freq = 1_000.0;
        let samples: Vec<f32> = (0..16_000)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sr).sin() as f32)
            .collect();
        let window = WindowFunction::Hann.padded(1024, 1024);
        let spec = power_spectrogram(&samples, 1024, 256, &window);

        let mid = spec.ncols() / 2;
        let peak_bin = (0..spec.nrows())
            .max_by(|&a, &b| spec[[a, mid]].total_cmp(&spec[[b, mid]]))
            .unwrap();
        // 1 kHz at 15.625 Hz per bin
        assert_eq!(peak_bin, 64);
    }
}
