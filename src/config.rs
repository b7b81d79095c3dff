//! Runtime configuration
//!
//! Settings come from environment variables or a JSON file; anything left
//! unset falls back to its default.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SermoError};
use crate::features::ModelVariant;

pub const ENV_MODEL_DIR: &str = "SERMO_MODEL_DIR";
pub const ENV_SCRATCH_DIR: &str = "SERMO_SCRATCH_DIR";
pub const ENV_DEFAULT_MODEL: &str = "SERMO_DEFAULT_MODEL";
pub const ENV_STORE_URL: &str = "FIREBASE_DB_URL";
pub const ENV_STORE_TIMEOUT_MS: &str = "SERMO_STORE_TIMEOUT_MS";
pub const ENV_DEVICE_ADDR: &str = "SERMO_DEVICE_ADDR";
pub const ENV_CAPTURE_DIR: &str = "SERMO_CAPTURE_DIR";
pub const ENV_CAPTURE_SECONDS: &str = "SERMO_CAPTURE_SECONDS";
pub const ENV_CAPTURE_GRACE_MS: &str = "SERMO_CAPTURE_GRACE_MS";

/// Service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding the classifier artifacts
    pub model_dir: PathBuf,
    /// Where uploads are spooled while decoding
    pub scratch_dir: PathBuf,
    pub default_model: ModelVariant,
    /// Realtime database URL; persistence is off when unset
    pub store_url: Option<String>,
    pub store_timeout_ms: u64,
    /// Capture device `host:port`
    pub device_addr: Option<String>,
    pub capture_dir: PathBuf,
    pub capture_seconds: u32,
    pub capture_grace_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            scratch_dir: env::temp_dir(),
            default_model: ModelVariant::Normal,
            store_url: None,
            store_timeout_ms: 10_000,
            device_addr: None,
            capture_dir: PathBuf::from("captures"),
            capture_seconds: 6,
            capture_grace_ms: 5_000,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by whichever environment variables are set
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load a JSON config file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SermoError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| SermoError::Config {
            reason: format!("invalid config {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Build from an arbitrary key lookup, blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get(ENV_MODEL_DIR) {
            config.model_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_SCRATCH_DIR) {
            config.scratch_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_DEFAULT_MODEL) {
            config.default_model = v.trim().parse().map_err(|_| SermoError::Config {
                reason: format!("{} names no model variant: '{}'", ENV_DEFAULT_MODEL, v),
            })?;
        }
        config.store_url = get(ENV_STORE_URL);
        if let Some(v) = get(ENV_STORE_TIMEOUT_MS) {
            config.store_timeout_ms = parse_number(ENV_STORE_TIMEOUT_MS, &v)?;
        }
        config.device_addr = get(ENV_DEVICE_ADDR);
        if let Some(v) = get(ENV_CAPTURE_DIR) {
            config.capture_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_CAPTURE_SECONDS) {
            config.capture_seconds = parse_number(ENV_CAPTURE_SECONDS, &v)?;
        }
        if let Some(v) = get(ENV_CAPTURE_GRACE_MS) {
            config.capture_grace_ms = parse_number(ENV_CAPTURE_GRACE_MS, &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture_seconds == 0 {
            return Err(SermoError::Config {
                reason: "capture_seconds must be at least 1".to_string(),
            });
        }
        if self.store_timeout_ms == 0 {
            return Err(SermoError::Config {
                reason: "store_timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn capture_grace(&self) -> Duration {
        Duration::from_millis(self.capture_grace_ms)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| SermoError::Config {
        reason: format!("{} must be a non-negative integer, got '{}'", key, value),
    })
}
