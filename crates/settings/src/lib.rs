//! VeilNet settings
//!
//! Startup configuration for a node: storage layout, node identity
//! defaults, SSU transport tunables, and dev flags. Read once at startup
//! from a JSON file and treated as read-only thereafter.
//!
//! ## Usage
//!
//! ```no_run
//! use veilnet_settings::Settings;
//!
//! let settings = Settings::load_from(&"config.json".into())?;
//! println!("listening on {}:{}", settings.ssu.host, settings.ssu.port);
//! # Ok::<(), veilnet_settings::SettingsError>(())
//! ```

mod config;

pub use config::{
    DevSettings, NodeSettings, SsuSettings, StorageSettings, SubDirs, Settings,
};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed settings JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;
