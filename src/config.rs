//! Host-supplied configuration.
//!
//! Every field has a default, so a config file only needs to mention what it
//! changes:
//!
//! ```json
//! {
//!     "history_limit": 32,
//!     "cache": { "idle_capacity": 64 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

const DEFAULT_IDLE_CAPACITY: usize = 0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Resource cache settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Idle entries (ref count zero) kept when memory pressure is signalled.
    /// The least recently used idle entries beyond this count are evicted.
    pub idle_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_capacity: DEFAULT_IDLE_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn idle_capacity(mut self, capacity: usize) -> Self {
        self.idle_capacity = capacity;
        self
    }
}

/// Registry settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub cache: CacheConfig,

    /// History limit applied to attached machines that were built without
    /// one. `None` keeps full histories.
    pub history_limit: Option<usize>,
}

impl RegistryConfig {
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = RegistryConfig::from_json("{}").unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.cache.idle_capacity, DEFAULT_IDLE_CAPACITY);
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn partial_config_overrides_named_fields() {
        let config =
            RegistryConfig::from_json(r#"{ "cache": { "idle_capacity": 16 } }"#).unwrap();

        assert_eq!(config.cache.idle_capacity, 16);
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn builder_setters_match_parsed_config() {
        let built = RegistryConfig::default()
            .history_limit(8)
            .cache(CacheConfig::default().idle_capacity(4));
        let parsed = RegistryConfig::from_json(
            r#"{ "history_limit": 8, "cache": { "idle_capacity": 4 } }"#,
        )
        .unwrap();

        assert_eq!(built, parsed);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            RegistryConfig::from_json("{ history_limit: }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            RegistryConfig::from_path("/nonexistent/lifeline.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
