//! Emotion inference
//!
//! [`InferenceService`] ties the engine, feature and neural layers together
//! and turns one audio input into one [`PredictionResult`].

mod result;
mod service;

pub use result::{select_label, ErrorBody, InferenceResponse, PredictionResult};
pub use service::InferenceService;
