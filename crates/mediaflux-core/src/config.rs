//! Engine configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for the mutation engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Path of the flat transaction log.
    pub log_path: PathBuf,

    /// File name of the per-directory ignore marker. Directories containing
    /// this marker are excluded from indexing.
    #[builder(default = "default_ignore_marker()")]
    #[serde(default = "default_ignore_marker")]
    pub ignore_marker: String,

    /// Report progress every this many items in tick-based loops.
    #[builder(default = "default_items_per_progress()")]
    #[serde(default = "default_items_per_progress")]
    pub items_per_progress: usize,
}

fn default_ignore_marker() -> String {
    ".nomedia".to_string()
}

fn default_items_per_progress() -> usize {
    10
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref log_path) = self.log_path {
            if log_path.as_os_str().is_empty() {
                return Err("Log path cannot be empty".to_string());
            }
        } else {
            return Err("Log path is required".to_string());
        }
        if let Some(0) = self.items_per_progress {
            return Err("items_per_progress must be at least 1".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Create a simple config with defaults for everything but the log path.
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            ignore_marker: default_ignore_marker(),
            items_per_progress: default_items_per_progress(),
        }
    }

    /// Check if a file name is the ignore marker.
    pub fn is_ignore_marker(&self, name: &str) -> bool {
        name == self.ignore_marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .log_path("/var/log/mediaflux.log")
            .items_per_progress(25usize)
            .build()
            .unwrap();

        assert_eq!(config.log_path, PathBuf::from("/var/log/mediaflux.log"));
        assert_eq!(config.items_per_progress, 25);
        assert_eq!(config.ignore_marker, ".nomedia");
    }

    #[test]
    fn test_config_requires_log_path() {
        assert!(EngineConfig::builder().build().is_err());
        assert!(EngineConfig::builder().log_path("").build().is_err());
    }

    #[test]
    fn test_zero_progress_tick_rejected() {
        let result = EngineConfig::builder()
            .log_path("/tmp/log")
            .items_per_progress(0usize)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_is_ignore_marker() {
        let config = EngineConfig::new("/tmp/log");
        assert!(config.is_ignore_marker(".nomedia"));
        assert!(!config.is_ignore_marker("photo.jpg"));
    }
}
