//! Prediction persistence
//!
//! Successful predictions are pushed to a JSON document store so other
//! clients can show the latest emotion and its history. Persistence is
//! best effort: a failure here is logged and never fails the prediction.

pub mod memory;
pub mod rotation;

#[cfg(feature = "firebase")]
pub mod firebase;

use log::{debug, warn};
use serde_json::Value;

use crate::error::Result;
use crate::inference::PredictionResult;

#[cfg(feature = "firebase")]
pub use firebase::FirebaseStore;
pub use memory::MemoryStore;
pub use rotation::{rotate, CurrentRecord, HistoryRecord, Rotation, CURRENT_PATH, HISTORY_PREFIX};

/// Somewhere to record predictions
pub trait PredictionStore: Send + Sync {
    fn record(&self, result: &PredictionResult) -> Result<()>;
}

/// Path-addressed JSON documents, the shape of a realtime database
pub trait DocumentStore: Send + Sync {
    /// Read the document at `path`, `None` if nothing is stored there
    fn get(&self, path: &str) -> Result<Option<Value>>;

    fn put(&self, path: &str, value: &Value) -> Result<()>;
}

impl<S: DocumentStore> PredictionStore for S {
    fn record(&self, result: &PredictionResult) -> Result<()> {
        record_at(self, result, rotation::now_ms())
    }
}

/// Rotate current into history and write the new current, stamped `now_ms`
pub fn record_at<S: DocumentStore + ?Sized>(
    store: &S,
    result: &PredictionResult,
    now_ms: i64,
) -> Result<()> {
    let existing = store.get(CURRENT_PATH)?;
    let rotation = rotate(existing.as_ref(), result, now_ms);

    if let Some(history) = &rotation.history {
        debug!("Retiring current prediction to {}", history.path);
        store.put(&history.path, &serde_json::to_value(&history.record)?)?;
    }
    store.put(CURRENT_PATH, &serde_json::to_value(&rotation.current)?)
}

/// Record `result`, logging instead of failing
///
/// Returns whether the write went through.
pub fn record_best_effort(store: &dyn PredictionStore, result: &PredictionResult) -> bool {
    match store.record(result) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to persist prediction: {}", e);
            false
        }
    }
}
