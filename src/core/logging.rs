//! Process-wide `tracing` subscriber for the `ssm` binary.
//!
//! Library code only emits events; installing a subscriber is the caller's
//! choice. `RUST_LOG` takes precedence over the configured level.

use crate::core::error::{SettingsError, SettingsResult};
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_err<E: std::fmt::Display>(e: E) -> SettingsError {
    SettingsError::Config(e.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `warn` or `ssm=debug`.
    pub level: String,
    /// Shorthand for `level = "debug"`.
    pub verbose: bool,
    /// Also append plain-text log lines to this file.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            verbose: false,
            file: None,
        }
    }
}

impl LogConfig {
    fn effective_level(&self) -> &str {
        if self.verbose { "debug" } else { &self.level }
    }

    fn build_filter(&self) -> SettingsResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(self.effective_level()).map_err(init_err),
        }
    }
}

pub fn init(config: &LogConfig) -> SettingsResult<()> {
    let filter = config.build_filter()?;

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(init_err)
}
