//! Run configuration
//!
//! Each process role receives an explicit, immutable copy of the values it
//! needs at spawn time; nothing reads ambient global state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for one computation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Catalog file: a single comma-separated record of product names
    pub catalog_path: PathBuf,
    /// Directory holding one CSV file per warehouse partition
    pub stores_dir: PathBuf,
    /// Space-separated 1-based product indices; prompt when absent
    #[serde(default)]
    pub selection: Option<String>,
    /// Bound on each named channel's in-flight contributions
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Seconds to wait for each worker/aggregator message before the run
    /// aborts with a diagnostic instead of hanging
    #[serde(default = "default_collect_timeout")]
    pub collect_timeout_secs: u64,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_collect_timeout() -> u64 {
    30
}

impl RunConfig {
    pub fn new(catalog_path: PathBuf, stores_dir: PathBuf) -> Self {
        Self {
            catalog_path,
            stores_dir,
            selection: None,
            channel_capacity: default_channel_capacity(),
            collect_timeout_secs: default_collect_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: RunConfig = serde_json::from_str(
            r#"{"catalog_path": "files/goods/Parts.csv", "stores_dir": "files/stores"}"#,
        )
        .unwrap();
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.collect_timeout_secs, 30);
        assert!(config.selection.is_none());
    }
}
