//! `ssm.toml` loading.
//!
//! ```toml
//! auto_save = true
//!
//! [log]
//! level = "info"
//! verbose = false
//! file = "SSM.log"
//! ```

use crate::core::error::{SettingsError, SettingsResult};
use crate::core::logging::LogConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "ssm.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SsmConfig {
    /// Initial auto-save setting for XML settings files.
    pub auto_save: bool,
    pub log: LogConfig,
}

impl Default for SsmConfig {
    fn default() -> Self {
        Self {
            auto_save: true,
            log: LogConfig::default(),
        }
    }
}

impl SsmConfig {
    pub fn parse(content: &str) -> SettingsResult<Self> {
        toml::from_str(content).map_err(|e| SettingsError::Config(e.to_string()))
    }

    /// Load `explicit`, or `ssm.toml` in the working directory. No file = defaults.
    pub fn load(explicit: Option<&Path>) -> SettingsResult<Self> {
        let path = explicit.map_or_else(|| PathBuf::from(CONFIG_FILE), Path::to_path_buf);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| SettingsError::Config(format!("{}: {e}", path.display())))
    }
}
