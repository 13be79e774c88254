//! Table definitions for SQLite settings files.
//!
//! One table per value kind, named after [`ValueKind::section`]. Identifiers
//! are only ever taken from that closed set; values are always bound as
//! parameters.

use crate::core::value::ValueKind;

pub const METADATA_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS \"_MetaData\" (
        VariableName VARCHAR(255),
        VariableGroup VARCHAR(255),
        VariableValue TEXT,
        VariableDesc VARCHAR(255)
    )
";

/// Column type of the value/default columns per kind.
fn value_column_type(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Int16 => "SMALLINT",
        ValueKind::Int32 => "INT",
        ValueKind::Int64 => "BIGINT",
        // Unsigned values are stored as little-endian bytes.
        ValueKind::UInt16 | ValueKind::UInt32 | ValueKind::UInt64 => "BLOB",
        ValueKind::Float => "FLOAT",
        ValueKind::Double => "REAL",
        ValueKind::String => "TEXT",
        ValueKind::ByteArray => "BLOB",
        ValueKind::Boolean => "BIT",
        ValueKind::MetaData => "TEXT",
    }
}

/// Quoted table identifier for a kind.
pub fn table(kind: ValueKind) -> String {
    format!("\"{}\"", kind.section())
}

pub fn create_table(kind: ValueKind) -> String {
    if kind.is_metadata() {
        return METADATA_SCHEMA.to_string();
    }
    let col = value_column_type(kind);
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            VariableName VARCHAR(255),
            VariableGroup VARCHAR(255),
            VariableValue {col},
            VariableDefault {col},
            VariableDesc VARCHAR(255)
        )",
        table(kind)
    )
}
