//! Current/history rotation
//!
//! The store keeps one "current" prediction. Recording a new one first
//! moves the previous current into history under a millisecond-stamped key.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::features::ModelVariant;
use crate::inference::PredictionResult;
use crate::neural::EmotionLabel;

pub const CURRENT_PATH: &str = "predictions/current";
pub const HISTORY_PREFIX: &str = "predictions/history";

/// The latest prediction as stored at [`CURRENT_PATH`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentRecord {
    pub result: EmotionLabel,
    pub confidence: f32,
    pub model_name: ModelVariant,
    /// Unix time in milliseconds
    pub last_updated: i64,
}

impl CurrentRecord {
    pub fn new(result: &PredictionResult, now_ms: i64) -> Self {
        Self {
            result: result.label,
            confidence: result.confidence,
            model_name: result.model_used,
            last_updated: now_ms,
        }
    }
}

/// A superseded prediction
///
/// Built from whatever the store held, so every field is optional: a
/// current record written by another client may be missing any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub result: Option<String>,
    pub confidence: Option<f64>,
    pub model_name: Option<String>,
    /// The old record's `lastUpdated`
    pub timestamp: Option<i64>,
}

impl HistoryRecord {
    fn from_current(current: &Value) -> Self {
        Self {
            result: current.get("result").and_then(Value::as_str).map(str::to_string),
            confidence: current.get("confidence").and_then(Value::as_f64),
            model_name: current.get("modelName").and_then(Value::as_str).map(str::to_string),
            timestamp: current.get("lastUpdated").and_then(Value::as_i64),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub path: String,
    pub record: HistoryRecord,
}

/// Writes needed to record one prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Rotation {
    /// Written first, if there was a current record to retire
    pub history: Option<HistoryEntry>,
    pub current: CurrentRecord,
}

pub fn history_path(now_ms: i64) -> String {
    format!("{}/prediction{}", HISTORY_PREFIX, now_ms)
}

/// Compute the writes for recording `result` at `now_ms`
///
/// `existing` is the value currently stored at [`CURRENT_PATH`]. Null and
/// empty objects count as "nothing stored".
pub fn rotate(existing: Option<&Value>, result: &PredictionResult, now_ms: i64) -> Rotation {
    let history = existing.filter(|value| has_content(value)).map(|value| HistoryEntry {
        path: history_path(now_ms),
        record: HistoryRecord::from_current(value),
    });

    Rotation {
        history,
        current: CurrentRecord::new(result, now_ms),
    }
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Wall-clock time in Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
