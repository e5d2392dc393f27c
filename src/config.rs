//! Configuration for pg_cache_sync.
//!
//! Settings are plain TOML. Every key is optional; a missing key falls back
//! to its default, so an empty document is a valid configuration.
//!
//! ```toml
//! default_schema = "public"
//! debounce_ms = 500
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Schema assumed for unqualified table and function names.
pub const DEFAULT_SCHEMA: &str = "public";

/// Delay between the last SQL editor change and classification.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Crate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Schema assigned to `table` and `function` events whose statement
    /// carries no schema qualifier.
    pub default_schema: String,

    /// Debounce delay in milliseconds applied by
    /// [`EventDebouncer`](crate::aggregator::EventDebouncer).
    pub debounce_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_schema: DEFAULT_SCHEMA.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, SyncError> {
        let config: SyncConfig = toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the classifier cannot honour.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.default_schema.trim().is_empty() {
            return Err(SyncError::Config("default_schema cannot be empty".into()));
        }
        if self.default_schema.chars().any(char::is_whitespace) {
            return Err(SyncError::Config(format!(
                "default_schema '{}' must not contain whitespace",
                self.default_schema
            )));
        }
        Ok(())
    }

    /// The debounce delay as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
