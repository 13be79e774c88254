//! Timestamp and version helpers for store provenance metadata.

/// Crate version as recorded in metadata (e.g. `v0.4.0`).
pub fn app_version() -> String {
    format!("v{}", env!("CARGO_PKG_VERSION"))
}

/// On-disk layout version written by this crate.
pub const FORMAT_VERSION: &str = "1.0";

/// Returns unix-epoch seconds as a decimal string (e.g. `1771220592`).
pub fn now_epoch() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    secs.to_string()
}
