//! Model registry
//!
//! Resolves each variant to its classifier artifact, loads it on first use
//! and keeps it for the lifetime of the registry.
//!
//! Cache hits take a shared read lock only. On a miss the artifact is
//! loaded *outside* the lock, so two callers racing on the same variant may
//! both load it; the first to insert wins and the other copy is dropped.
//! That bounded duplicate work is accepted in exchange for never holding a
//! lock across a slow load, and no caller ever sees a half-built instance.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::classifier::{Classifier, ClassifierLoader};
use crate::error::{Result, SermoError};
use crate::features::ModelVariant;

// ============================================================================
// Artifact store
// ============================================================================

/// Where a variant's trained model lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// File name relative to the artifact root
    pub file_name: String,
    /// Expected lowercase hex SHA-256 of the file, if pinned
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ModelArtifact {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into().to_ascii_lowercase());
        self
    }
}

/// Maps variants to artifact files under a root directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    artifacts: HashMap<ModelVariant, ModelArtifact>,
}

impl ArtifactStore {
    /// Create an empty store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            artifacts: HashMap::new(),
        }
    }

    /// Store with the bundled ONNX exports for every variant
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(root);
        store.insert(ModelVariant::Normal, ModelArtifact::new("model_mfcc_26_large.onnx"));
        store.insert(ModelVariant::Mini, ModelArtifact::new("model_mfcc_mini.onnx"));
        store
    }

    pub fn insert(&mut self, variant: ModelVariant, artifact: ModelArtifact) {
        self.artifacts.insert(variant, artifact);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact(&self, variant: ModelVariant) -> Option<&ModelArtifact> {
        self.artifacts.get(&variant)
    }

    /// Resolve and verify the artifact path for `variant`
    ///
    /// # Errors
    /// * `ModelLoad` - If no artifact is registered, the file is missing, or
    ///   its checksum does not match
    pub fn resolve(&self, variant: ModelVariant) -> Result<PathBuf> {
        let artifact = self.artifacts.get(&variant).ok_or_else(|| {
            SermoError::model_load(variant.as_str(), "no artifact registered for variant")
        })?;

        let path = self.root.join(&artifact.file_name);
        if !path.is_file() {
            return Err(SermoError::model_load(
                variant.as_str(),
                format!("artifact not found at {}", path.display()),
            ));
        }

        if let Some(expected) = &artifact.sha256 {
            let actual = sha256_file(&path).map_err(|e| SermoError::ModelLoad {
                variant: variant.to_string(),
                reason: format!("cannot read {}", path.display()),
                source: Some(Box::new(e)),
            })?;
            if &actual != expected {
                return Err(SermoError::model_load(
                    variant.as_str(),
                    format!(
                        "checksum mismatch for {}: expected {}, found {}",
                        path.display(),
                        expected,
                        actual
                    ),
                ));
            }
        }

        Ok(path)
    }
}

/// Lowercase hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Model registry
// ============================================================================

/// Lazily loads and memoizes classifiers by variant
pub struct ModelRegistry {
    artifacts: ArtifactStore,
    loader: Arc<dyn ClassifierLoader>,
    cache: RwLock<HashMap<ModelVariant, Arc<dyn Classifier>>>,
}

impl ModelRegistry {
    /// Create a registry with an empty cache
    pub fn new(artifacts: ArtifactStore, loader: Arc<dyn ClassifierLoader>) -> Self {
        Self {
            artifacts,
            loader,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Get the classifier for a string key, loading it on first use
    ///
    /// # Errors
    /// * `UnknownModelVariant` - If the key names no variant
    /// * `ModelLoad` - If the artifact is missing or cannot be loaded
    pub fn get_classifier(&self, key: &str) -> Result<Arc<dyn Classifier>> {
        let variant: ModelVariant = key.parse()?;
        self.get(variant)
    }

    /// Get the classifier for `variant`, loading it on first use
    pub fn get(&self, variant: ModelVariant) -> Result<Arc<dyn Classifier>> {
        if let Some(classifier) = self.cached(variant) {
            return Ok(classifier);
        }

        let path = self.artifacts.resolve(variant)?;
        info!("Loading {} classifier from {}", variant, path.display());
        let start = Instant::now();
        let loaded = self.loader.load(variant, &path)?;
        debug!(
            "Loaded {} classifier in {} ms",
            variant,
            start.elapsed().as_millis()
        );

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let winner = cache.entry(variant).or_insert(loaded);
        Ok(Arc::clone(winner))
    }

    /// Load every listed variant up front
    pub fn preload(&self, variants: &[ModelVariant]) -> Result<()> {
        for &variant in variants {
            self.get(variant)?;
        }
        Ok(())
    }

    /// Check if a variant is already cached
    pub fn is_loaded(&self, variant: ModelVariant) -> bool {
        self.cached(variant).is_some()
    }

    /// Variants currently cached, in a stable order
    pub fn loaded_variants(&self) -> Vec<ModelVariant> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        let mut variants: Vec<_> = cache.keys().copied().collect();
        variants.sort();
        variants
    }

    fn cached(&self, variant: ModelVariant) -> Option<Arc<dyn Classifier>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache.get(&variant).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::mock::CountingLoader;
    use tempfile::tempdir;

    fn store_with_files(dir: &Path) -> ArtifactStore {
        let store = ArtifactStore::with_defaults(dir);
        for variant in ModelVariant::ALL {
            let name = &store.artifact(variant).unwrap().file_name;
            std::fs::write(dir.join(name), b"onnx").unwrap();
        }
        store
    }

    #[test]
    fn test_second_lookup_hits_cache() {
        let dir = tempdir().unwrap();
        let loader = Arc::new(CountingLoader::new(vec![0.2, 0.5, 0.3]));
        let registry = ModelRegistry::new(store_with_files(dir.path()), loader.clone());

        let first = registry.get_classifier("normal").unwrap();
        let second = registry.get_classifier("normal").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.load_count(), 1);
        assert!(registry.is_loaded(ModelVariant::Normal));
        assert!(!registry.is_loaded(ModelVariant::Mini));
    }

    #[test]
    fn test_unknown_key_never_loads() {
        let dir = tempdir().unwrap();
        let loader = Arc::new(CountingLoader::new(vec![1.0, 0.0, 0.0]));
        let registry = ModelRegistry::new(store_with_files(dir.path()), loader.clone());

        let err = registry.get_classifier("giant").err().unwrap();
        assert!(matches!(err, SermoError::UnknownModelVariant { .. }));
        assert_eq!(loader.load_count(), 0);
    }

    #[test]
    fn test_missing_artifact_is_load_error() {
        let dir = tempdir().unwrap();
        let loader = Arc::new(CountingLoader::new(vec![1.0, 0.0, 0.0]));
        let registry = ModelRegistry::new(ArtifactStore::with_defaults(dir.path()), loader);

        let err = registry.get(ModelVariant::Mini).err().unwrap();
        assert_eq!(err.error_code(), "MODEL_LOAD_ERROR");
        assert!(registry.loaded_variants().is_empty());
    }

    #[test]
    fn test_checksum_is_verified() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("mini.onnx"), b"abc").unwrap();
        let mut store = ArtifactStore::new(dir.path());

        // SHA-256("abc")
        let good = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        store.insert(ModelVariant::Mini, ModelArtifact::new("mini.onnx").with_sha256(good));
        assert!(store.resolve(ModelVariant::Mini).is_ok());

        store.insert(
            ModelVariant::Mini,
            ModelArtifact::new("mini.onnx").with_sha256("00".repeat(32)),
        );
        let err = store.resolve(ModelVariant::Mini).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_preload_caches_all() {
        let dir = tempdir().unwrap();
        let loader = Arc::new(CountingLoader::new(vec![0.3, 0.3, 0.4]));
        let registry = ModelRegistry::new(store_with_files(dir.path()), loader.clone());

        registry.preload(&ModelVariant::ALL).unwrap();
        assert_eq!(
            registry.loaded_variants(),
            vec![ModelVariant::Normal, ModelVariant::Mini]
        );
        assert_eq!(loader.load_count(), 2);
    }
}
