//! Classifier trait and emotion labels
//!
//! Defines the interface every trained emotion classifier implements, and
//! the loader seam the model registry uses to create them.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SermoError};
use crate::features::{FeatureTensor, ModelVariant};

/// Emotion classes, in the classifier's output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionLabel {
    #[serde(rename = "HAP")]
    Happy,
    #[serde(rename = "NEU")]
    Neutral,
    #[serde(rename = "SAD")]
    Sad,
}

impl EmotionLabel {
    /// All labels, indexed like the classifier's probability vector
    pub const ALL: [EmotionLabel; 3] = [EmotionLabel::Happy, EmotionLabel::Neutral, EmotionLabel::Sad];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "HAP",
            Self::Neutral => "NEU",
            Self::Sad => "SAD",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = SermoError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "HAP" => Ok(Self::Happy),
            "NEU" => Ok(Self::Neutral),
            "SAD" => Ok(Self::Sad),
            other => Err(SermoError::Inference {
                reason: format!("Unknown emotion label: {}", other),
            }),
        }
    }
}

/// A loaded, ready-to-run emotion classifier
pub trait Classifier: Send + Sync {
    /// Variant this classifier was trained for
    fn variant(&self) -> ModelVariant;

    /// Run a forward pass and return one probability per [`EmotionLabel`]
    fn predict(&self, features: &FeatureTensor) -> Result<Vec<f32>>;
}

/// Creates classifiers from artifacts on disk
pub trait ClassifierLoader: Send + Sync {
    /// Load the artifact at `artifact` as a classifier for `variant`
    ///
    /// # Errors
    /// * `ModelLoad` - If the artifact cannot be parsed or initialised
    fn load(&self, variant: ModelVariant, artifact: &Path) -> Result<Arc<dyn Classifier>>;
}
