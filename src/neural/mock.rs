//! Mock classifier implementations for testing
//!
//! These don't run a network. They return fixed probability vectors so the
//! pipeline around the classifier can be tested deterministically, and the
//! loader counts how often the registry actually loads an artifact.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::classifier::{Classifier, ClassifierLoader};
use crate::error::{Result, SermoError};
use crate::features::{FeatureTensor, ModelVariant};

/// Classifier that always returns the same probabilities
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    variant: ModelVariant,
    probabilities: Vec<f32>,
}

impl FixedClassifier {
    pub fn new(variant: ModelVariant, probabilities: Vec<f32>) -> Self {
        Self {
            variant,
            probabilities,
        }
    }
}

impl Classifier for FixedClassifier {
    fn variant(&self) -> ModelVariant {
        self.variant
    }

    fn predict(&self, features: &FeatureTensor) -> Result<Vec<f32>> {
        if features.variant() != self.variant {
            return Err(SermoError::Inference {
                reason: format!(
                    "{} classifier fed {} features",
                    self.variant,
                    features.variant()
                ),
            });
        }
        Ok(self.probabilities.clone())
    }
}

/// Classifier whose forward pass always fails
#[derive(Debug, Clone)]
pub struct FailingClassifier {
    variant: ModelVariant,
}

impl FailingClassifier {
    pub fn new(variant: ModelVariant) -> Self {
        Self { variant }
    }
}

impl Classifier for FailingClassifier {
    fn variant(&self) -> ModelVariant {
        self.variant
    }

    fn predict(&self, _features: &FeatureTensor) -> Result<Vec<f32>> {
        Err(SermoError::Inference {
            reason: "mock forward pass failure".to_string(),
        })
    }
}

/// Loader that hands out [`FixedClassifier`]s and counts loads
#[derive(Debug)]
pub struct CountingLoader {
    probabilities: Vec<f32>,
    delay: Option<Duration>,
    loads: AtomicUsize,
}

impl CountingLoader {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self {
            probabilities,
            delay: None,
            loads: AtomicUsize::new(0),
        }
    }

    /// Simulate a slow artifact load
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `load` has been called
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ClassifierLoader for CountingLoader {
    fn load(&self, variant: ModelVariant, _artifact: &Path) -> Result<Arc<dyn Classifier>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Ok(Arc::new(FixedClassifier::new(
            variant,
            self.probabilities.clone(),
        )))
    }
}

/// Loader that hands out [`FailingClassifier`]s
#[derive(Debug, Default)]
pub struct FailingLoader;

impl ClassifierLoader for FailingLoader {
    fn load(&self, variant: ModelVariant, _artifact: &Path) -> Result<Arc<dyn Classifier>> {
        Ok(Arc::new(FailingClassifier::new(variant)))
    }
}
