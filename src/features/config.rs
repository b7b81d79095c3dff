//! Model variant configuration
//!
//! Each model variant pairs a trained classifier with the exact feature
//! parameters it was trained on. Configs are plain values built once at
//! start-up and never mutated; frame timing is derived from the sample
//! rate on demand rather than stored.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dsp::stft::frame_count;
use crate::dsp::{MfccParams, WindowFunction};
use crate::engine::waveform::{clip_len, CANONICAL_SAMPLE_RATE};
use crate::error::{Result, SermoError};

/// Hop between STFT frames, in seconds
pub const HOP_SECONDS: f64 = 0.010;

/// STFT analysis window, in seconds
pub const WIN_SECONDS: f64 = 0.025;

/// Hop length in samples for `sample_rate`
pub fn hop_length_for(sample_rate: u32) -> usize {
    (HOP_SECONDS * sample_rate as f64).round() as usize
}

/// Window length in samples for `sample_rate`
pub fn win_length_for(sample_rate: u32) -> usize {
    (WIN_SECONDS * sample_rate as f64).round() as usize
}

// ============================================================================
// ModelVariant
// ============================================================================

/// Identifier selecting a classifier and its feature configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// 26 coefficients, larger network
    Normal,
    /// 13 coefficients, smaller network
    Mini,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Normal, ModelVariant::Mini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Mini => "mini",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = SermoError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "mini" => Ok(Self::Mini),
            other => Err(SermoError::UnknownModelVariant {
                key: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// ModelConfig
// ============================================================================

/// Feature-extraction parameters and tensor layout for one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub variant: ModelVariant,
    pub sample_rate: u32,
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub window: WindowFunction,
    pub n_mels: usize,
    /// Standardize coefficients with the training-time `mean` / `std`
    pub normalize: bool,
    pub mean: f32,
    pub std: f32,
    /// (batch, coefficients, frames, channels)
    pub output_shape: [usize; 4],
}

impl ModelConfig {
    /// The 26-coefficient variant
    pub fn normal() -> Self {
        Self {
            variant: ModelVariant::Normal,
            sample_rate: CANONICAL_SAMPLE_RATE,
            n_mfcc: 26,
            n_fft: 2048,
            window: WindowFunction::Hamming,
            n_mels: 26,
            normalize: true,
            mean: -7.042_613_5,
            std: 48.8516,
            output_shape: [1, 26, 301, 1],
        }
    }

    /// The 13-coefficient variant
    pub fn mini() -> Self {
        Self {
            variant: ModelVariant::Mini,
            sample_rate: CANONICAL_SAMPLE_RATE,
            n_mfcc: 13,
            n_fft: 1024,
            window: WindowFunction::Hamming,
            n_mels: 13,
            normalize: true,
            mean: -36.16106,
            std: 162.93813,
            output_shape: [1, 13, 301, 1],
        }
    }

    pub fn hop_length(&self) -> usize {
        hop_length_for(self.sample_rate)
    }

    pub fn win_length(&self) -> usize {
        win_length_for(self.sample_rate)
    }

    /// Samples in one canonical clip at this config's rate
    pub fn clip_samples(&self) -> usize {
        clip_len(self.sample_rate)
    }

    /// STFT frames produced for one canonical clip
    pub fn frame_count(&self) -> usize {
        frame_count(self.clip_samples(), self.n_fft, self.hop_length())
    }

    /// Number of elements in `output_shape`
    pub fn output_len(&self) -> usize {
        self.output_shape.iter().product()
    }

    pub fn mfcc_params(&self) -> MfccParams {
        MfccParams {
            sample_rate: self.sample_rate,
            n_mfcc: self.n_mfcc,
            n_fft: self.n_fft,
            hop_length: self.hop_length(),
            win_length: self.win_length(),
            window: self.window,
            n_mels: self.n_mels,
            f_min: 0.0,
            f_max: self.sample_rate as f64 / 2.0,
        }
    }

    /// Check parameter sanity.
    ///
    /// Tensor shape consistency is deliberately left to extraction time,
    /// where a mismatch is reported as `ShapeMismatch`.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(SermoError::Config {
                reason: format!("{} config: {}", self.variant, reason),
            })
        };

        if self.sample_rate == 0 {
            return fail("sample_rate must be positive".to_string());
        }
        if self.n_mfcc == 0 || self.n_mels == 0 {
            return fail("n_mfcc and n_mels must be positive".to_string());
        }
        if self.n_mfcc > self.n_mels {
            return fail(format!(
                "n_mfcc ({}) exceeds n_mels ({})",
                self.n_mfcc, self.n_mels
            ));
        }
        if self.hop_length() == 0 {
            return fail("hop length rounds to zero".to_string());
        }
        if self.win_length() > self.n_fft {
            return fail(format!(
                "window of {} samples does not fit n_fft {}",
                self.win_length(),
                self.n_fft
            ));
        }
        if self.normalize && !(self.std.is_finite() && self.std > 0.0 && self.mean.is_finite()) {
            return fail(format!("invalid normalization stats {}/{}", self.mean, self.std));
        }
        Ok(())
    }
}

// ============================================================================
// ModelConfigRegistry
// ============================================================================

/// Static lookup from variant key to feature configuration
#[derive(Debug, Clone)]
pub struct ModelConfigRegistry {
    configs: HashMap<ModelVariant, ModelConfig>,
}

impl ModelConfigRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            configs: HashMap::new(),
        }
    }

    /// Create a registry holding the bundled `normal` and `mini` configs
    pub fn with_defaults() -> Self {
        let mut configs = HashMap::new();
        for config in [ModelConfig::normal(), ModelConfig::mini()] {
            configs.insert(config.variant, config);
        }
        Self { configs }
    }

    /// Register or replace a config after validating it
    pub fn register(&mut self, config: ModelConfig) -> Result<()> {
        config.validate()?;
        self.configs.insert(config.variant, config);
        Ok(())
    }

    /// Look up a config by variant
    pub fn get(&self, variant: ModelVariant) -> Result<&ModelConfig> {
        self.configs
            .get(&variant)
            .ok_or_else(|| SermoError::UnknownModelVariant {
                key: variant.to_string(),
            })
    }

    /// Look up a config by its string key
    ///
    /// # Errors
    /// * `UnknownModelVariant` - If the key names no registered variant
    pub fn get_config(&self, key: &str) -> Result<&ModelConfig> {
        let variant: ModelVariant = key.parse()?;
        self.get(variant)
    }

    /// Registered variants in a stable order
    pub fn variants(&self) -> Vec<ModelVariant> {
        let mut variants: Vec<_> = self.configs.keys().copied().collect();
        variants.sort();
        variants
    }

    pub fn has_variant(&self, variant: ModelVariant) -> bool {
        self.configs.contains_key(&variant)
    }
}

impl Default for ModelConfigRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
