//! Prediction results and their wire form

use serde::{Deserialize, Serialize};

use crate::error::{Result, SermoError};
use crate::features::ModelVariant;
use crate::neural::EmotionLabel;

/// Outcome of one successful inference call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: EmotionLabel,
    /// Classifier probability for `label`, in [0, 1]
    pub confidence: f32,
    pub model_used: ModelVariant,
}

/// Structured error handed back instead of a prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
}

impl From<&SermoError> for ErrorBody {
    fn from(err: &SermoError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
        }
    }
}

/// What the outer surface serialises: a prediction, or `{"error": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InferenceResponse {
    Prediction(PredictionResult),
    Error { error: ErrorBody },
}

impl InferenceResponse {
    pub fn is_prediction(&self) -> bool {
        matches!(self, InferenceResponse::Prediction(_))
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            InferenceResponse::Prediction(result) => Some(result),
            InferenceResponse::Error { .. } => None,
        }
    }
}

impl From<Result<PredictionResult>> for InferenceResponse {
    fn from(result: Result<PredictionResult>) -> Self {
        match result {
            Ok(prediction) => InferenceResponse::Prediction(prediction),
            Err(err) => InferenceResponse::Error {
                error: ErrorBody::from(&err),
            },
        }
    }
}

/// Pick the most probable label.
///
/// The first maximum wins ties, so the choice is deterministic for any
/// input.
///
/// # Errors
/// * `Inference` - If the vector length does not match the label set, or
///   any entry is not a probability in [0, 1] (NaN, infinite, or a raw logit)
pub fn select_label(probabilities: &[f32]) -> Result<(EmotionLabel, f32)> {
    if probabilities.len() != EmotionLabel::ALL.len() {
        return Err(SermoError::Inference {
            reason: format!(
                "classifier returned {} probabilities for {} labels",
                probabilities.len(),
                EmotionLabel::ALL.len()
            ),
        });
    }
    if let Some((index, p)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        return Err(SermoError::Inference {
            reason: format!("class {} has probability {}, outside [0, 1]", index, p),
        });
    }

    let mut best = (0, probabilities[0]);
    for (index, &p) in probabilities.iter().enumerate().skip(1) {
        if p > best.1 {
            best = (index, p);
        }
    }

    let (index, confidence) = best;
    let label = EmotionLabel::from_index(index).ok_or_else(|| SermoError::Inference {
        reason: format!("no label for class index {}", index),
    })?;
    Ok((label, confidence))
}
