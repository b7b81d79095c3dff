//! Error handling for Sermo
//!
//! Every failure the pipeline can produce maps to one variant here, so the
//! inference boundary can hand callers a tagged error instead of a crash.

use thiserror::Error;

/// Result type alias for Sermo operations
pub type Result<T> = std::result::Result<T, SermoError>;

/// Main error type for Sermo operations
#[derive(Error, Debug)]
pub enum SermoError {
    // Model Errors
    #[error("Unknown model variant: {key}")]
    UnknownModelVariant { key: String },

    #[error("Failed to load model '{variant}': {reason}")]
    ModelLoad {
        variant: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Audio Errors
    #[error("Failed to decode audio: {reason}")]
    AudioDecode {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Feature Errors
    #[error("Feature shape mismatch: expected {expected:?}, produced {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    // Inference Errors
    #[error("Inference failed: {reason}")]
    Inference { reason: String },

    // Collaborator Errors
    #[error("Capture timed out after {received_bytes} of {expected_bytes} bytes")]
    CaptureTimeout {
        expected_bytes: usize,
        received_bytes: usize,
    },

    #[error("Persistence error: {reason}")]
    Persistence { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SermoError {
    /// Shorthand for an `AudioDecode` error that wraps a lower-level cause.
    pub fn decode<E>(reason: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SermoError::AudioDecode {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a `ModelLoad` error without an underlying cause.
    pub fn model_load(variant: impl Into<String>, reason: impl Into<String>) -> Self {
        SermoError::ModelLoad {
            variant: variant.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SermoError::UnknownModelVariant { .. } => "UNKNOWN_MODEL_VARIANT",
            SermoError::ModelLoad { .. } => "MODEL_LOAD_ERROR",
            SermoError::AudioDecode { .. } => "AUDIO_DECODE_ERROR",
            SermoError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            SermoError::Inference { .. } => "INFERENCE_ERROR",
            SermoError::CaptureTimeout { .. } => "CAPTURE_TIMEOUT",
            SermoError::Persistence { .. } => "PERSISTENCE_ERROR",
            SermoError::Config { .. } => "CONFIG_ERROR",
            SermoError::Io(_) => "IO_ERROR",
            SermoError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can reasonably retry with different input.
    ///
    /// Shape mismatches and load failures point at the deployment, not the
    /// request, so they are not recoverable from the caller's side.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SermoError::UnknownModelVariant { .. }
                | SermoError::AudioDecode { .. }
                | SermoError::CaptureTimeout { .. }
                | SermoError::Persistence { .. }
        )
    }
}
