use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("Format error: {0}")]
    Format(String),
    #[error("Unrecognized settings file format: {}", .0.display())]
    UnknownFormat(PathBuf),
    #[error("Invalid variable or group name: {0:?}")]
    InvalidName(String),
    #[error("Cross-mode migration requires two different modes")]
    SameMode,
    #[error("Settings file is not open")]
    NotOpen,
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;
