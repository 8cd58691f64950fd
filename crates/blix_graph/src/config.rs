// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph engine configuration.

use crate::snapshot::LoadPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "graph.ron";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON for this format
    #[error("Config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serializing to RON failed
    #[error("Config serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// The file was written by a newer version
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Settings for a [`GraphStore`](crate::GraphStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Format version
    pub version: u32,
    /// What to do with invalid snapshot entries
    pub load_policy: LoadPolicy,
    /// Emit indented JSON when serializing snapshots
    pub pretty_snapshots: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            load_policy: LoadPolicy::SkipInvalid,
            pretty_snapshots: false,
        }
    }
}

impl GraphConfig {
    /// Load configuration from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::info!("Loaded graph config from {:?}", path);
        Ok(config)
    }

    /// Parse configuration from RON text
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        let config: GraphConfig = ron::from_str(content)?;
        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        Ok(config)
    }

    /// Save configuration to a RON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Render configuration as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.version, CONFIG_FORMAT_VERSION);
        assert_eq!(config.load_policy, LoadPolicy::SkipInvalid);
        assert!(!config.pretty_snapshots);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = GraphConfig {
            load_policy: LoadPolicy::Abort,
            pretty_snapshots: true,
            ..GraphConfig::default()
        };
        let loaded = GraphConfig::from_ron(&config.to_ron().unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded = GraphConfig::from_ron("(load_policy: Abort)").unwrap();
        assert_eq!(loaded.load_policy, LoadPolicy::Abort);
        assert_eq!(loaded.version, CONFIG_FORMAT_VERSION);
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = GraphConfig::from_ron("(version: 99)").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 99, .. }));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("blix-graph-{}.ron", uuid::Uuid::new_v4()));
        let config = GraphConfig {
            pretty_snapshots: true,
            ..GraphConfig::default()
        };
        config.save(&path).unwrap();
        let loaded = GraphConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
