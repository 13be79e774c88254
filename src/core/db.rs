use crate::core::error;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Busy timeout for settings connections.
const BUSY_TIMEOUT_SECS: u64 = 5;

pub fn db_connect(db_path: &Path) -> Result<Connection, error::SettingsError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS))
        .map_err(error::SettingsError::Sqlite)?;
    Ok(conn)
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, error::SettingsError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
