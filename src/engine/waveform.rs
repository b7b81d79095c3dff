//! Canonical waveform
//!
//! The one audio shape the feature pipeline accepts: mono, f32, a fixed
//! sample rate and exactly [`CLIP_SECONDS`] worth of samples.

// ============================================================================
// Constants
// ============================================================================

/// Duration of every canonical clip in seconds
pub const CLIP_SECONDS: u32 = 3;

/// Sample rate the bundled model variants were trained at
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;

/// Number of samples a canonical clip holds at `sample_rate`
#[inline]
pub fn clip_len(sample_rate: u32) -> usize {
    CLIP_SECONDS as usize * sample_rate as usize
}

/// Truncate or zero-pad on the right so `samples` is exactly `len` long.
///
/// Never touches the head of the signal, so onset timing is preserved.
pub fn fit_to_length(mut samples: Vec<f32>, len: usize) -> Vec<f32> {
    samples.resize(len, 0.0);
    samples
}

// ============================================================================
// Waveform
// ============================================================================

/// A mono, fixed-rate, fixed-length clip ready for feature extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Build a canonical waveform, padding or truncating to the clip length.
    pub fn canonical(samples: Vec<f32>, sample_rate: u32) -> Self {
        let samples = fit_to_length(samples, clip_len(sample_rate));
        Self {
            samples,
            sample_rate,
        }
    }

    /// A silent canonical clip
    pub fn silence(sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; clip_len(sample_rate)],
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }
}
