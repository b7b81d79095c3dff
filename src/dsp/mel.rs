//! Mel filterbank and log compression
//!
//! Uses the Slaney mel scale (linear below 1 kHz, logarithmic above) with
//! area-normalised triangular filters, which is what the bundled classifiers
//! were trained against.

use ndarray::Array2;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

/// Power floor before taking the log
pub const AMIN: f64 = 1e-10;

/// Dynamic range kept below the loudest bin, in dB
pub const TOP_DB: f64 = 80.0;

fn log_step() -> f64 {
    6.4_f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filterbank with shape `(n_mels, n_fft / 2 + 1)`
pub fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    f_min: f64,
    f_max: f64,
) -> Array2<f64> {
    let bins = n_fft / 2 + 1;
    let mut weights = Array2::<f64>::zeros((n_mels, bins));
    if n_mels == 0 || n_fft == 0 {
        return weights;
    }

    let nyquist = sample_rate as f64 / 2.0;
    let fft_freqs: Vec<f64> = (0..bins)
        .map(|i| i as f64 * nyquist / (bins - 1).max(1) as f64)
        .collect();

    let mel_min = hz_to_mel(f_min);
    let mel_max = hz_to_mel(f_max);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    for m in 0..n_mels {
        let left = mel_points[m];
        let center = mel_points[m + 1];
        let right = mel_points[m + 2];
        // Slaney normalisation: every filter has unit area
        let enorm = 2.0 / (right - left);

        for (bin, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - left) / (center - left);
            let upper = (right - freq) / (right - center);
            let w = lower.min(upper).max(0.0);
            weights[[m, bin]] = w * enorm;
        }
    }

    weights
}

/// Convert a power spectrogram to decibels in place.
///
/// Values are floored at [`AMIN`] and then clipped to [`TOP_DB`] below the
/// maximum of the whole matrix.
pub fn power_to_db(spec: &mut Array2<f64>) {
    spec.mapv_inplace(|p| 10.0 * p.max(AMIN).log10());
    let peak = spec.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if peak.is_finite() {
        let floor = peak - TOP_DB;
        spec.mapv_inplace(|db| db.max(floor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mel_scale_is_linear_below_1khz() {
        assert_relative_eq!(hz_to_mel(200.0), 3.0, epsilon = 1e-12);
        assert_relative_eq!(hz_to_mel(1000.0), 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mel_roundtrip() {
        for hz in [0.0, 300.0, 999.0, 1000.0, 4000.0, 8000.0] {
            assert_relative_eq!(mel_to_hz(hz_to_mel(hz)), hz, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_filterbank_shape_and_non_negative() {
        let fb = mel_filterbank(16_000, 2048, 26, 0.0, 8_000.0);
        assert_eq!(fb.dim(), (26, 1025));
        assert!(fb.iter().all(|&w| w >= 0.0));
        // Every band picks up at least one bin at this resolution
        for row in fb.rows() {
            assert!(row.iter().any(|&w| w > 0.0));
        }
    }

    #[test]
    fn test_power_to_db_floor() {
        let mut spec = Array2::from_elem((2, 2), 0.0);
        power_to_db(&mut spec);
        assert!(spec.iter().all(|&v| (v + 100.0).abs() < 1e-9));

        let mut spec = Array2::from_shape_vec((1, 2), vec![1.0, 1e-12]).unwrap();
        power_to_db(&mut spec);
        assert_relative_eq!(spec[[0, 0]], 0.0);
        assert_relative_eq!(spec[[0, 1]], -80.0);
    }
}
