//! Configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Result, SettingsError};

/// Main settings structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Data directory layout
    #[serde(default)]
    pub storage: StorageSettings,

    /// Node identity and routing defaults
    #[serde(default)]
    pub node: NodeSettings,

    /// SSU transport tunables
    #[serde(default)]
    pub ssu: SsuSettings,

    /// Development flags
    #[serde(default)]
    pub dev: DevSettings,

    /// Where these settings were loaded from (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a path, or fall back to defaults when the file
    /// does not exist.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
                path: path.clone(),
                source,
            })?;
            let mut settings: Settings = serde_json::from_str(&content)?;
            settings.config_path = Some(path.clone());
            info!("Loaded settings from {:?}", path);
            Ok(settings)
        } else {
            let mut settings = Self::default();
            settings.config_path = Some(path.clone());
            Ok(settings)
        }
    }

    /// Save settings to the path they were loaded from (or the given one).
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        let write_err = |source: std::io::Error| SettingsError::Write {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let path = self
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("config.json"));
        self.save_to(&path)
    }
}

/// Where persisted state lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir", rename = "data-dir")]
    pub data_dir: PathBuf,

    #[serde(default, rename = "sub-dirs")]
    pub sub_dirs: SubDirs,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sub_dirs: SubDirs::default(),
        }
    }
}

/// Subdirectory names under the data dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubDirs {
    #[serde(default = "default_nri_sub")]
    pub nri: String,
    #[serde(default = "default_rri_sub")]
    pub rri: String,
    #[serde(default = "default_local_sub")]
    pub local: String,
}

fn default_nri_sub() -> String {
    "nri".to_string()
}

fn default_rri_sub() -> String {
    "rri".to_string()
}

fn default_local_sub() -> String {
    "local".to_string()
}

impl Default for SubDirs {
    fn default() -> Self {
        Self {
            nri: default_nri_sub(),
            rri: default_rri_sub(),
            local: default_local_sub(),
        }
    }
}

/// Node identity and routing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Stable node id; generated when absent.
    #[serde(default)]
    pub node_id: Option<String>,

    /// Advertised node type.
    #[serde(default = "default_node_type")]
    pub node_type: String,

    /// Advertised capability tags.
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Hop cap for generated routing maps.
    #[serde(default = "default_max_map_size")]
    pub max_map_size: usize,

    /// Default flood depth for propagations.
    #[serde(default = "default_propagation_depth")]
    pub propagation_depth: u32,

    /// Chain build strategy: "threaded" or "batched".
    #[serde(default = "default_chain_strategy")]
    pub routing_chain_method: String,
}

fn default_node_type() -> String {
    "standard".to_string()
}

fn default_max_map_size() -> usize {
    20
}

fn default_propagation_depth() -> u32 {
    2
}

fn default_chain_strategy() -> String {
    "threaded".to_string()
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            node_id: None,
            node_type: default_node_type(),
            capabilities: Vec::new(),
            max_map_size: default_max_map_size(),
            propagation_depth: default_propagation_depth(),
            routing_chain_method: default_chain_strategy(),
        }
    }
}

/// SSU transport tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsuSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_loop_index")]
    pub max_ssu_loop_index: usize,

    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9999
}

fn default_loop_index() -> usize {
    5
}

fn default_connection_timeout() -> u64 {
    10
}

impl Default for SsuSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_ssu_loop_index: default_loop_index(),
            connection_timeout_secs: default_connection_timeout(),
        }
    }
}

/// Development flags.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DevSettings {
    #[serde(default)]
    pub debug: bool,
}
