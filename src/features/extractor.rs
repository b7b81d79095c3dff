//! MFCC feature extraction
//!
//! Turns a canonical waveform into the 4-D tensor a classifier variant
//! expects: MFCCs computed with the variant's parameters, standardized with
//! its training-time statistics, reshaped to its declared output shape.

use log::debug;
use ndarray::{Array2, Array4, ArrayView4};

use super::config::{ModelConfig, ModelVariant};
use crate::dsp::mfcc;
use crate::engine::Waveform;
use crate::error::{Result, SermoError};

/// Classifier input with shape `(batch, coefficients, frames, channels)`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    variant: ModelVariant,
    data: Array4<f32>,
}

impl FeatureTensor {
    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn shape(&self) -> [usize; 4] {
        let (a, b, c, d) = self.data.dim();
        [a, b, c, d]
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Coefficient `k` at frame `t` of the first batch/channel
    pub fn coefficient(&self, k: usize, t: usize) -> Option<f32> {
        self.data.get([0, k, t, 0]).copied()
    }
}

/// Computes classifier input tensors from canonical waveforms
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the feature tensor for `config` from `waveform`
    ///
    /// # Errors
    /// * `Config` - If the waveform's sample rate differs from the config's
    /// * `ShapeMismatch` - If the MFCC matrix does not fill `output_shape` exactly
    pub fn extract(&self, waveform: &Waveform, config: &ModelConfig) -> Result<FeatureTensor> {
        if waveform.sample_rate() != config.sample_rate {
            return Err(SermoError::Config {
                reason: format!(
                    "{} expects {} Hz audio, got {} Hz",
                    config.variant,
                    config.sample_rate,
                    waveform.sample_rate()
                ),
            });
        }

        let coefficients = mfcc(waveform.samples(), &config.mfcc_params());
        let coefficients = if config.normalize {
            standardize(coefficients, config.mean as f64, config.std as f64)
        } else {
            coefficients
        };

        let (n_mfcc, frames) = coefficients.dim();
        debug!(
            "Extracted {}x{} MFCC matrix for {}",
            n_mfcc, frames, config.variant
        );

        let data = reshape(&coefficients, config.output_shape)?;
        Ok(FeatureTensor {
            variant: config.variant,
            data,
        })
    }
}

/// Fixed linear rescale with training-time statistics
fn standardize(mut coefficients: Array2<f64>, mean: f64, std: f64) -> Array2<f64> {
    coefficients.mapv_inplace(|v| (v - mean) / std);
    coefficients
}

fn reshape(coefficients: &Array2<f64>, shape: [usize; 4]) -> Result<Array4<f32>> {
    let (rows, cols) = coefficients.dim();
    let expected: usize = shape.iter().product();
    if rows * cols != expected {
        return Err(SermoError::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![rows, cols],
        });
    }

    // Row-major: coefficient-major, frames contiguous
    let flat: Vec<f32> = coefficients.iter().map(|&v| v as f32).collect();
    Array4::from_shape_vec((shape[0], shape[1], shape[2], shape[3]), flat).map_err(|_| {
        SermoError::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![rows, cols],
        }
    })
}
