//! Feature extraction
//!
//! - [`ModelConfigRegistry`]: per-variant MFCC parameters and tensor layout
//! - [`FeatureExtractor`]: canonical waveform -> normalized feature tensor

mod config;
mod extractor;

pub use config::{
    hop_length_for, win_length_for, ModelConfig, ModelConfigRegistry, ModelVariant, HOP_SECONDS,
    WIN_SECONDS,
};
pub use extractor::{FeatureExtractor, FeatureTensor};
