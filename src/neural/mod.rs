//! Neural classifier interfaces and implementations
//!
//! This module provides:
//! - `Classifier` / `ClassifierLoader` traits
//! - `ModelRegistry`, the lazy per-variant classifier cache
//! - ONNX Runtime backed classifiers
//! - Mock implementations for testing

mod classifier;
pub mod mock;
mod onnx;
mod registry;

pub use classifier::{Classifier, ClassifierLoader, EmotionLabel};
pub use onnx::{OnnxClassifier, OnnxLoader};
pub use registry::{sha256_file, ArtifactStore, ModelArtifact, ModelRegistry};
