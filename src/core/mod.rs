//! Core types and services shared by both storage modes.
//!
//! Value encodings, records, the settings-file facade, migration and the
//! ambient pieces (errors, config, logging, terminal output) live here.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod migration;
pub mod output;
pub mod record;
pub mod schemas;
pub mod sniff;
pub mod store;
pub mod time;
pub mod value;
