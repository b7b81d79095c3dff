//! ONNX Runtime classifier
//!
//! The trained Keras models are exported to ONNX and executed with `ort`.
//! Each model takes one `(1, n_mfcc, frames, 1)` f32 tensor and yields one
//! `(1, 3)` softmax row ordered HAP, NEU, SAD.
//!
//! `Session::run` needs `&mut self`, so the session sits behind a mutex;
//! concurrent predictions on the same variant are serialized.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use ort::session::Session;
use ort::value::Tensor;

use super::classifier::{Classifier, ClassifierLoader, EmotionLabel};
use crate::error::{Result, SermoError};
use crate::features::{FeatureTensor, ModelVariant};

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    variant: ModelVariant,
    session: Mutex<Session>,
}

impl OnnxClassifier {
    /// Build a session for the model at `path`
    pub fn load(variant: ModelVariant, path: &Path, intra_threads: usize) -> Result<Self> {
        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(intra_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| SermoError::ModelLoad {
                variant: variant.to_string(),
                reason: format!("ONNX Runtime rejected {}: {}", path.display(), e),
                source: None,
            })?;

        Ok(Self {
            variant,
            session: Mutex::new(session),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn variant(&self) -> ModelVariant {
        self.variant
    }

    fn predict(&self, features: &FeatureTensor) -> Result<Vec<f32>> {
        let input = Tensor::from_array(features.view().to_owned())
            .map_err(|e| inference_error(self.variant, "tensor creation", e))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| inference_error(self.variant, "forward pass", e))?;

        let mut output_iter = outputs.iter();
        let (_, value) = output_iter.next().ok_or_else(|| SermoError::Inference {
            reason: format!("{} model produced no output", self.variant),
        })?;
        if output_iter.next().is_some() {
            warn!("{} model has more than one output, using the first", self.variant);
        }

        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| inference_error(self.variant, "output extraction", e))?;
        debug!("{} output shape {:?}", self.variant, shape);

        // Batch of one: the single row holds the class probabilities
        if data.len() != EmotionLabel::ALL.len() {
            return Err(SermoError::Inference {
                reason: format!(
                    "{} model returned {} values, expected {}",
                    self.variant,
                    data.len(),
                    EmotionLabel::ALL.len()
                ),
            });
        }
        Ok(data.to_vec())
    }
}

fn inference_error(variant: ModelVariant, stage: &str, e: impl fmt::Display) -> SermoError {
    SermoError::Inference {
        reason: format!("{} {}: {}", variant, stage, e),
    }
}

/// Loads `.onnx` artifacts into [`OnnxClassifier`]s
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    intra_threads: usize,
}

impl OnnxLoader {
    pub fn new(intra_threads: usize) -> Self {
        Self {
            intra_threads: intra_threads.max(1),
        }
    }
}

impl Default for OnnxLoader {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ClassifierLoader for OnnxLoader {
    fn load(&self, variant: ModelVariant, artifact: &Path) -> Result<Arc<dyn Classifier>> {
        let classifier = OnnxClassifier::load(variant, artifact, self.intra_threads)?;
        Ok(Arc::new(classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_garbage_artifact_is_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model_mfcc_mini.onnx");
        std::fs::write(&path, b"this is not a protobuf").unwrap();

        let err = OnnxLoader::default()
            .load(ModelVariant::Mini, &path)
            .err()
            .unwrap();
        assert_eq!(err.error_code(), "MODEL_LOAD_ERROR");
    }
}
