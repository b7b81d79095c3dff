//! Model Registry Tests
//!
//! Cache identity and concurrent first access.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use sermo::features::ModelVariant;
use sermo::neural::mock::CountingLoader;
use sermo::neural::{ArtifactStore, Classifier, ModelRegistry};
use sermo::SermoError;
use tempfile::tempdir;

fn registry(loader: Arc<CountingLoader>) -> (tempfile::TempDir, Arc<ModelRegistry>) {
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::with_defaults(dir.path());
    for variant in ModelVariant::ALL {
        let name = &artifacts.artifact(variant).unwrap().file_name;
        std::fs::write(dir.path().join(name), b"onnx").unwrap();
    }
    (dir, Arc::new(ModelRegistry::new(artifacts, loader)))
}

// === Cache Identity ===

#[test]
fn test_same_instance_on_repeat_lookup() {
    let loader = Arc::new(CountingLoader::new(vec![0.3, 0.3, 0.4]));
    let (_dir, registry) = registry(loader.clone());

    let a = registry.get_classifier("normal").unwrap();
    let b = registry.get_classifier("normal").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(loader.load_count(), 1);
}

#[test]
fn test_variants_cached_independently() {
    let loader = Arc::new(CountingLoader::new(vec![0.3, 0.3, 0.4]));
    let (_dir, registry) = registry(loader.clone());

    let normal = registry.get_classifier("normal").unwrap();
    let mini = registry.get_classifier("mini").unwrap();
    assert!(!Arc::ptr_eq(&normal, &mini));
    assert_eq!(normal.variant(), ModelVariant::Normal);
    assert_eq!(mini.variant(), ModelVariant::Mini);
    assert_eq!(loader.load_count(), 2);
}

#[test]
fn test_unknown_key() {
    let loader = Arc::new(CountingLoader::new(vec![0.3, 0.3, 0.4]));
    let (_dir, registry) = registry(loader);

    let err = registry.get_classifier("giant").err().unwrap();
    assert!(matches!(err, SermoError::UnknownModelVariant { ref key } if key == "giant"));
}

// === Concurrency ===

#[test]
fn test_concurrent_first_access_converges() {
    let loader = Arc::new(CountingLoader::new(vec![0.3, 0.3, 0.4]).with_delay(Duration::from_millis(50)));
    let (_dir, registry) = registry(loader.clone());

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_classifier("mini").unwrap()
            })
        })
        .collect();

    let results: Vec<Arc<dyn Classifier>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Duplicate loads may happen, but everyone ends up with the cached winner
    let cached = registry.get_classifier("mini").unwrap();
    for classifier in &results {
        assert!(Arc::ptr_eq(classifier, &cached));
    }
    assert!(loader.load_count() >= 1);
    assert!(loader.load_count() <= threads);

    let before = loader.load_count();
    registry.get_classifier("mini").unwrap();
    assert_eq!(loader.load_count(), before);
}
