//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command. Every command prints
//! JSON to stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::capture::DeviceCapture;
use crate::config::ServiceConfig;
use crate::engine::{AudioInput, AudioNormalizer};
use crate::error::{Result, SermoError};
use crate::features::{ModelConfig, ModelConfigRegistry};
use crate::inference::{InferenceResponse, InferenceService};
use crate::neural::{ArtifactStore, ModelRegistry, OnnxLoader};
use crate::store::{record_best_effort, PredictionStore};

/// Extensions `batch` picks up
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a", "aac", "webm"];

/// Everything the commands need, wired from a [`ServiceConfig`]
pub struct Runtime {
    pub config: ServiceConfig,
    pub service: InferenceService,
    pub store: Option<Arc<dyn PredictionStore>>,
}

impl Runtime {
    /// Wire the ONNX-backed service and, if configured, the history store
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        let models = ModelRegistry::new(
            ArtifactStore::with_defaults(&config.model_dir),
            Arc::new(OnnxLoader::default()),
        );
        let service = InferenceService::new(
            Arc::new(ModelConfigRegistry::with_defaults()),
            Arc::new(models),
            AudioNormalizer::new(&config.scratch_dir),
        );
        let store = open_store(&config)?;
        Ok(Self {
            config,
            service,
            store,
        })
    }

    fn model_key<'a>(&'a self, model: Option<&'a str>) -> &'a str {
        model.unwrap_or_else(|| self.config.default_model.as_str())
    }

    fn persist(&self, response: &InferenceResponse) {
        if let (Some(store), Some(prediction)) = (&self.store, response.prediction()) {
            record_best_effort(store.as_ref(), prediction);
        }
    }
}

#[cfg(feature = "firebase")]
fn open_store(config: &ServiceConfig) -> Result<Option<Arc<dyn PredictionStore>>> {
    match &config.store_url {
        Some(url) => {
            info!("Recording predictions to {}", url);
            let store = crate::store::FirebaseStore::new(url, config.store_timeout())?;
            Ok(Some(Arc::new(store)))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "firebase"))]
fn open_store(config: &ServiceConfig) -> Result<Option<Arc<dyn PredictionStore>>> {
    if config.store_url.is_some() {
        warn!("Store URL set but firebase support not compiled, predictions will not be recorded");
    }
    Ok(None)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

/// Classify one file.
pub fn predict(runtime: &Runtime, file: &Path, model: Option<&str>, store: bool) -> Result<InferenceResponse> {
    let key = runtime.model_key(model);
    info!("Predicting {} with {}", file.display(), key);

    let response = runtime.service.respond(&AudioInput::path(file), key);
    if store {
        runtime.persist(&response);
    }
    print_json(&response, true)?;
    Ok(response)
}

/// One line of `batch` output
#[derive(Debug, Serialize)]
pub struct BatchLine {
    pub file: PathBuf,
    #[serde(flatten)]
    pub response: InferenceResponse,
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Classify every audio file under `dir`, in path order.
pub fn batch(runtime: &Runtime, dir: &Path, model: Option<&str>) -> Result<Vec<BatchLine>> {
    if !dir.is_dir() {
        return Err(SermoError::Config {
            reason: format!("{} is not a directory", dir.display()),
        });
    }
    let key = runtime.model_key(model);
    info!("Batch predicting {} with {}", dir.display(), key);

    let mut lines = Vec::new();
    let entries = WalkDir::new(dir).sort_by_file_name().into_iter();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_audio_file(path) {
            continue;
        }

        let line = BatchLine {
            file: path.to_path_buf(),
            response: runtime.service.respond(&AudioInput::path(path), key),
        };
        print_json(&line, false)?;
        lines.push(line);
    }

    info!("Classified {} files", lines.len());
    Ok(lines)
}

/// Record from the capture device and classify.
pub fn capture(
    runtime: &Runtime,
    model: Option<&str>,
    duration: Option<u32>,
    keep: bool,
) -> Result<InferenceResponse> {
    let addr = runtime.config.device_addr.as_deref().ok_or_else(|| SermoError::Config {
        reason: "no capture device configured (SERMO_DEVICE_ADDR)".to_string(),
    })?;
    let duration = duration.unwrap_or(runtime.config.capture_seconds);
    let key = runtime.model_key(model);
    info!("Capturing {} s from {}", duration, addr);

    let device = DeviceCapture::new(addr, runtime.config.capture_grace());
    let response = match device.capture(duration) {
        Ok(clip) => {
            if !clip.is_complete() {
                warn!(
                    "Short capture: {} of {} bytes",
                    clip.received_bytes(),
                    clip.expected_bytes()
                );
            }
            if keep {
                clip.archive(&runtime.config.capture_dir)?;
            }
            runtime.service.respond(&clip.to_input(), key)
        }
        Err(e) => {
            warn!("Capture failed: {}", e);
            InferenceResponse::from(Err(e))
        }
    };

    runtime.persist(&response);
    print_json(&response, true)?;
    Ok(response)
}

/// A variant's feature config and artifact status
#[derive(Debug, Serialize)]
pub struct ModelListing<'a> {
    #[serde(flatten)]
    pub config: &'a ModelConfig,
    pub artifact: Option<PathBuf>,
    pub loaded: bool,
}

/// Print every variant's config.
pub fn list_models(runtime: &Runtime) -> Result<()> {
    let configs = runtime.service.configs();
    let models = runtime.service.models();

    for variant in configs.variants() {
        let config = configs.get(variant)?;
        let artifact = models
            .artifacts()
            .artifact(variant)
            .map(|a| models.artifacts().root().join(&a.file_name));
        let listing = ModelListing {
            config,
            artifact,
            loaded: models.is_loaded(variant),
        };
        print_json(&listing, true)?;
    }
    Ok(())
}
