use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub version: u32,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Paths are relative to the store home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub traces_dir: String,
    pub snapshots_dir: String,
    pub goldens_file: String,
    pub sqlite_index: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            traces_dir: "traces".into(),
            snapshots_dir: "snapshots".into(),
            goldens_file: "goldens.json".into(),
            sqlite_index: "index.db".into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            storage: StorageConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> StoreResult<StoreConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let cfg: StoreConfig = serde_yaml::from_str(&raw)
        .map_err(|e| StoreError::Config(format!("failed to parse YAML: {}", e)))?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(StoreError::Config(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    for (name, value) in [
        ("traces_dir", &cfg.storage.traces_dir),
        ("snapshots_dir", &cfg.storage.snapshots_dir),
        ("goldens_file", &cfg.storage.goldens_file),
        ("sqlite_index", &cfg.storage.sqlite_index),
    ] {
        if value.trim().is_empty() {
            return Err(StoreError::Config(format!("storage.{name} must not be empty")));
        }
    }
    Ok(cfg)
}

pub fn write_default_config(path: &Path) -> StoreResult<()> {
    let body = serde_yaml::to_string(&StoreConfig::default())
        .map_err(|e| StoreError::Config(format!("failed to render default config: {}", e)))?;
    std::fs::write(path, body).map_err(|e| StoreError::io(path, e))
}
