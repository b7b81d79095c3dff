//! In-memory document store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use super::DocumentStore;
use crate::error::{Result, SermoError};

/// Document store held in a map, for tests and offline runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, Value>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read and write fail, or recover
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of every stored path
    pub fn paths(&self) -> Vec<String> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        documents.keys().cloned().collect()
    }

    /// Paths under `prefix`
    pub fn paths_under(&self, prefix: &str) -> Vec<String> {
        self.paths()
            .into_iter()
            .filter(|path| path.starts_with(prefix))
            .collect()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SermoError::Persistence {
                reason: "memory store is offline".to_string(),
            });
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, path: &str) -> Result<Option<Value>> {
        self.check_online()?;
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(documents.get(path).cloned())
    }

    fn put(&self, path: &str, value: &Value) -> Result<()> {
        self.check_online()?;
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        documents.insert(path.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ModelVariant;
    use crate::inference::PredictionResult;
    use crate::neural::EmotionLabel;
    use crate::store::{record_at, record_best_effort, CURRENT_PATH, HISTORY_PREFIX};
    use serde_json::json;

    fn result(label: EmotionLabel) -> PredictionResult {
        PredictionResult {
            label,
            confidence: 0.8,
            model_used: ModelVariant::Mini,
        }
    }

    #[test]
    fn test_two_records_leave_one_history_entry() {
        let store = MemoryStore::new();
        record_at(&store, &result(EmotionLabel::Happy), 100).unwrap();
        record_at(&store, &result(EmotionLabel::Sad), 200).unwrap();

        let current = store.get(CURRENT_PATH).unwrap().unwrap();
        assert_eq!(current["result"], "SAD");
        assert_eq!(current["lastUpdated"], 200);

        assert_eq!(
            store.paths_under(HISTORY_PREFIX),
            vec!["predictions/history/prediction200".to_string()]
        );
        let history = store.get("predictions/history/prediction200").unwrap().unwrap();
        assert_eq!(history["result"], "HAP");
        assert_eq!(history["timestamp"], json!(100));
    }

    #[test]
    fn test_offline_store_fails_softly() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(!record_best_effort(&store, &result(EmotionLabel::Neutral)));

        store.set_offline(false);
        assert!(record_best_effort(&store, &result(EmotionLabel::Neutral)));
        assert_eq!(store.paths(), vec![CURRENT_PATH.to_string()]);
    }
}
