//! Inference service
//!
//! The pipeline entry point: resolve the variant's config and classifier,
//! normalize the audio, extract features, classify, pick a label.
//!
//! Config and classifier are resolved before any audio is touched, so a
//! bad key or a missing model fails fast and never spools an upload.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tracing::info_span;

use super::result::{select_label, InferenceResponse, PredictionResult};
use crate::engine::{AudioInput, AudioNormalizer};
use crate::error::Result;
use crate::features::{FeatureExtractor, ModelConfigRegistry, ModelVariant};
use crate::neural::ModelRegistry;

/// Orchestrates normalization, feature extraction and classification
pub struct InferenceService {
    configs: Arc<ModelConfigRegistry>,
    models: Arc<ModelRegistry>,
    normalizer: AudioNormalizer,
    extractor: FeatureExtractor,
}

impl InferenceService {
    pub fn new(
        configs: Arc<ModelConfigRegistry>,
        models: Arc<ModelRegistry>,
        normalizer: AudioNormalizer,
    ) -> Self {
        Self {
            configs,
            models,
            normalizer,
            extractor: FeatureExtractor::new(),
        }
    }

    pub fn configs(&self) -> &ModelConfigRegistry {
        &self.configs
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Classify `input` with the variant named by `model_key`
    ///
    /// # Errors
    /// * `UnknownModelVariant` - Bad key, reported before any I/O
    /// * `ModelLoad` - Classifier artifact missing or unreadable
    /// * `AudioDecode` - Input audio cannot be decoded
    /// * `ShapeMismatch` - Config and waveform disagree on tensor shape
    /// * `Inference` - Forward pass failed or returned a malformed vector
    pub fn infer(&self, input: &AudioInput, model_key: &str) -> Result<PredictionResult> {
        let variant: ModelVariant = model_key.parse()?;
        self.infer_variant(input, variant)
    }

    /// Same as [`infer`](Self::infer) with an already-parsed variant
    pub fn infer_variant(&self, input: &AudioInput, variant: ModelVariant) -> Result<PredictionResult> {
        let span = info_span!("infer", model = %variant);
        let _enter = span.enter();
        let start = Instant::now();

        let config = self.configs.get(variant)?;
        let classifier = self.models.get(variant)?;

        debug!("Normalizing {}", input.describe());
        let waveform = self.normalizer.normalize(input, config.sample_rate)?;
        let features = self.extractor.extract(&waveform, config)?;
        let probabilities = classifier.predict(&features)?;
        let (label, confidence) = select_label(&probabilities)?;

        info!(
            "Predicted {} ({:.3}) with {} in {} ms",
            label,
            confidence,
            variant,
            start.elapsed().as_millis()
        );

        Ok(PredictionResult {
            label,
            confidence,
            model_used: variant,
        })
    }

    /// Run [`infer`](Self::infer) and fold any failure into the response
    pub fn respond(&self, input: &AudioInput, model_key: &str) -> InferenceResponse {
        let result = self.infer(input, model_key);
        if let Err(err) = &result {
            warn!("Inference with '{}' failed: {}", model_key, err);
        }
        InferenceResponse::from(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::write_pcm16_wav;
    use crate::inference::ErrorBody;
    use crate::neural::mock::{CountingLoader, FailingLoader};
    use crate::neural::{ArtifactStore, ClassifierLoader, EmotionLabel};
    use tempfile::{tempdir, TempDir};

    fn service_with(loader: Arc<dyn ClassifierLoader>) -> (TempDir, InferenceService) {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::with_defaults(dir.path());
        for variant in ModelVariant::ALL {
            let name = &store.artifact(variant).unwrap().file_name;
            std::fs::write(dir.path().join(name), b"onnx").unwrap();
        }
        let models = Arc::new(ModelRegistry::new(store, loader));
        let scratch = dir.path().join("scratch");
        let service = InferenceService::new(
            Arc::new(ModelConfigRegistry::with_defaults()),
            models,
            AudioNormalizer::new(scratch),
        );
        (dir, service)
    }

    fn service(probabilities: Vec<f32>) -> (TempDir, Arc<CountingLoader>, InferenceService) {
        let loader = Arc::new(CountingLoader::new(probabilities));
        let (dir, service) = service_with(loader.clone());
        (dir, loader, service)
    }

    #[test]
    fn test_infer_picks_argmax() {
        let (_dir, _loader, service) = service(vec![0.1, 0.7, 0.2]);
        let input = AudioInput::mono(vec![0.0; 32_000], 16_000);

        let result = service.infer(&input, "mini").unwrap();
        assert_eq!(result.label, EmotionLabel::Neutral);
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.model_used, ModelVariant::Mini);
    }

    #[test]
    fn test_unknown_key_fails_before_loading() {
        let (_dir, loader, service) = service(vec![0.1, 0.7, 0.2]);
        let input = AudioInput::mono(vec![0.0; 100], 16_000);

        let err = service.infer(&input, "giant").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_MODEL_VARIANT");
        assert_eq!(loader.load_count(), 0);
    }

    #[test]
    fn test_wav_path_input() {
        let (dir, _loader, service) = service(vec![0.2, 0.2, 0.6]);
        let path = dir.path().join("clip.wav");
        write_pcm16_wav(&path, &[1_000i16; 24_000], 16_000).unwrap();

        let result = service.infer(&AudioInput::path(&path), "normal").unwrap();
        assert_eq!(result.label, EmotionLabel::Sad);
        assert_eq!(result.model_used, ModelVariant::Normal);
    }

    #[test]
    fn test_respond_wraps_errors() {
        let (_dir, _loader, service) = service(vec![0.1, 0.7, 0.2]);
        let input = AudioInput::bytes(b"garbage".to_vec(), Some("clip.mp3"));

        let response = service.respond(&input, "mini");
        assert!(!response.is_prediction());
    }

    #[test]
    fn test_respond_reports_forward_pass_failure() {
        let (_dir, service) = service_with(Arc::new(FailingLoader));
        let input = AudioInput::mono(vec![0.0; 16_000], 16_000);

        match service.respond(&input, "normal") {
            InferenceResponse::Error { error: ErrorBody { code, recoverable, .. } } => {
                assert_eq!(code, "INFERENCE_ERROR");
                assert!(!recoverable);
            }
            other => panic!("expected error response, got {:?}", other),
        }
    }

    #[test]
    fn test_respond_rejects_logits() {
        let (_dir, _loader, service) = service(vec![0.2, 1.7, -0.3]);
        let input = AudioInput::mono(vec![0.0; 16_000], 16_000);

        let response = service.respond(&input, "mini");
        assert_eq!(response.prediction(), None);
    }
}
