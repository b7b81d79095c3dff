//! Firebase Realtime Database store
//!
//! Talks to the database's REST surface: every path is a JSON document at
//! `<base_url>/<path>.json`, read with `GET` and replaced with `PUT`.

use std::time::Duration;

use log::debug;
use serde_json::Value;

use super::DocumentStore;
use crate::error::{Result, SermoError};

pub struct FirebaseStore {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl FirebaseStore {
    /// Create a store for the database at `base_url`
    ///
    /// # Errors
    /// * `Config` - If the URL is empty or the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SermoError::Config {
                reason: "database URL is empty".to_string(),
            });
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SermoError::Config {
                reason: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn document_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }
}

fn request_error(method: &str, url: &str, e: reqwest::Error) -> SermoError {
    let reason = if e.is_timeout() {
        format!("{} {} timed out", method, url)
    } else if e.is_connect() {
        format!("cannot connect for {} {}: {}", method, url, e)
    } else {
        format!("{} {} failed: {}", method, url, e)
    };
    SermoError::Persistence { reason }
}

impl DocumentStore for FirebaseStore {
    fn get(&self, path: &str) -> Result<Option<Value>> {
        let url = self.document_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| request_error("GET", &url, e))?;
        if !response.status().is_success() {
            return Err(SermoError::Persistence {
                reason: format!("GET {} returned {}", url, response.status()),
            });
        }

        let value: Value = response
            .json()
            .map_err(|e| request_error("GET", &url, e))?;
        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }

    fn put(&self, path: &str, value: &Value) -> Result<()> {
        let url = self.document_url(path);
        debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .json(value)
            .send()
            .map_err(|e| request_error("PUT", &url, e))?;
        if !response.status().is_success() {
            return Err(SermoError::Persistence {
                reason: format!("PUT {} returned {}", url, response.status()),
            });
        }
        Ok(())
    }
}
