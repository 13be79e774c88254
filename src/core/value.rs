//! Value kinds and their encodings.
//!
//! Every stored variable belongs to exactly one [`ValueKind`]. The kind owns a
//! fixed section identifier which doubles as the SQLite table name and the XML
//! branch element name, so no section name is ever built from caller input.
//!
//! [`SettingValue`] ties a Rust type to its kind and to the three encodings a
//! value travels through:
//! - record bytes (the payload of a [`TypedRecord`](crate::core::record::TypedRecord)),
//! - markup text (XML leaf content),
//! - relational columns (SQLite values).

use crate::core::error::{SettingsError, SettingsResult};
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Closed set of type tags a variable can be stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    Int16,
    Int32,
    Int64,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
    ByteArray,
    Boolean,
    MetaData,
}

impl ValueKind {
    /// Every kind, metadata first. This is the enumeration order of bulk reads.
    pub const ALL: [ValueKind; 12] = [
        ValueKind::MetaData,
        ValueKind::Int16,
        ValueKind::Int32,
        ValueKind::Int64,
        ValueKind::UInt16,
        ValueKind::UInt32,
        ValueKind::UInt64,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::String,
        ValueKind::ByteArray,
        ValueKind::Boolean,
    ];

    /// Kinds that user variables can be stored under.
    pub const VARIABLES: [ValueKind; 11] = [
        ValueKind::Int16,
        ValueKind::Int32,
        ValueKind::Int64,
        ValueKind::UInt16,
        ValueKind::UInt32,
        ValueKind::UInt64,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::String,
        ValueKind::ByteArray,
        ValueKind::Boolean,
    ];

    /// Section identifier: SQLite table name and XML branch name.
    pub fn section(self) -> &'static str {
        match self {
            ValueKind::Int16 => "Int16",
            ValueKind::Int32 => "Int32",
            ValueKind::Int64 => "Int64",
            ValueKind::UInt16 => "UInt16",
            ValueKind::UInt32 => "UInt32",
            ValueKind::UInt64 => "UInt64",
            ValueKind::Float => "Float",
            ValueKind::Double => "Double",
            ValueKind::String => "String",
            ValueKind::ByteArray => "ByteArray",
            ValueKind::Boolean => "Boolean",
            ValueKind::MetaData => "_MetaData",
        }
    }

    pub fn from_section(section: &str) -> Option<ValueKind> {
        ValueKind::ALL.into_iter().find(|k| k.section() == section)
    }

    /// Lenient lookup used by the CLI (`int32`, `Int32`, `bytes`, `bool`, ...).
    pub fn parse_cli(input: &str) -> Option<ValueKind> {
        let lowered = input.to_ascii_lowercase();
        let kind = match lowered.as_str() {
            "int16" | "i16" | "short" => ValueKind::Int16,
            "int32" | "i32" | "int" => ValueKind::Int32,
            "int64" | "i64" | "long" => ValueKind::Int64,
            "uint16" | "u16" => ValueKind::UInt16,
            "uint32" | "u32" => ValueKind::UInt32,
            "uint64" | "u64" => ValueKind::UInt64,
            "float" | "f32" => ValueKind::Float,
            "double" | "f64" => ValueKind::Double,
            "string" | "str" => ValueKind::String,
            "bytearray" | "bytes" => ValueKind::ByteArray,
            "boolean" | "bool" => ValueKind::Boolean,
            "metadata" | "_metadata" => ValueKind::MetaData,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_metadata(self) -> bool {
        self == ValueKind::MetaData
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// Expands `$body` once per variable kind with `$t` aliased to the Rust type
/// stored under that kind. Metadata is handled by `$meta`.
#[macro_export]
macro_rules! dispatch_kind {
    ($kind:expr, $t:ident => $body:expr, meta => $meta:expr) => {
        match $kind {
            $crate::core::value::ValueKind::Int16 => {
                type $t = i16;
                $body
            }
            $crate::core::value::ValueKind::Int32 => {
                type $t = i32;
                $body
            }
            $crate::core::value::ValueKind::Int64 => {
                type $t = i64;
                $body
            }
            $crate::core::value::ValueKind::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::core::value::ValueKind::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::core::value::ValueKind::UInt64 => {
                type $t = u64;
                $body
            }
            $crate::core::value::ValueKind::Float => {
                type $t = f32;
                $body
            }
            $crate::core::value::ValueKind::Double => {
                type $t = f64;
                $body
            }
            $crate::core::value::ValueKind::String => {
                type $t = ::std::string::String;
                $body
            }
            $crate::core::value::ValueKind::ByteArray => {
                type $t = ::std::vec::Vec<u8>;
                $body
            }
            $crate::core::value::ValueKind::Boolean => {
                type $t = bool;
                $body
            }
            $crate::core::value::ValueKind::MetaData => $meta,
        }
    };
}

/// A Rust type that can be stored as a settings variable.
pub trait SettingValue: Sized + Clone + PartialEq + Default + fmt::Debug + Send + Sync {
    const KIND: ValueKind;

    /// Canonical record payload.
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> SettingsResult<Self>;

    /// XML leaf content.
    fn to_text(&self) -> String;
    fn from_text(text: &str) -> SettingsResult<Self>;

    /// SQLite column value.
    fn to_sql(&self) -> SqlValue;
    fn from_sql(value: &SqlValue) -> SettingsResult<Self>;
}

fn format_err(kind: ValueKind, detail: impl fmt::Display) -> SettingsError {
    SettingsError::Format(format!("{kind}: {detail}"))
}

fn fixed<const N: usize>(kind: ValueKind, bytes: &[u8]) -> SettingsResult<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| format_err(kind, format!("expected {N} bytes, found {}", bytes.len())))
}

macro_rules! signed_setting {
    ($ty:ty, $kind:expr) => {
        impl SettingValue for $ty {
            const KIND: ValueKind = $kind;

            fn to_bytes(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn from_bytes(bytes: &[u8]) -> SettingsResult<Self> {
                Ok(<$ty>::from_le_bytes(fixed(Self::KIND, bytes)?))
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn from_text(text: &str) -> SettingsResult<Self> {
                text.trim()
                    .parse::<$ty>()
                    .map_err(|e| format_err(Self::KIND, format!("{text:?}: {e}")))
            }

            fn to_sql(&self) -> SqlValue {
                SqlValue::Integer(i64::from(*self))
            }

            fn from_sql(value: &SqlValue) -> SettingsResult<Self> {
                match value {
                    SqlValue::Integer(i) => <$ty>::try_from(*i)
                        .map_err(|_| format_err(Self::KIND, format!("{i} out of range"))),
                    other => Err(format_err(Self::KIND, format!("unexpected column {other:?}"))),
                }
            }
        }
    };
}

// Unsigned values live in BLOB columns: SQLite integers are signed 64-bit.
macro_rules! unsigned_setting {
    ($ty:ty, $kind:expr) => {
        impl SettingValue for $ty {
            const KIND: ValueKind = $kind;

            fn to_bytes(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn from_bytes(bytes: &[u8]) -> SettingsResult<Self> {
                Ok(<$ty>::from_le_bytes(fixed(Self::KIND, bytes)?))
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn from_text(text: &str) -> SettingsResult<Self> {
                text.trim()
                    .parse::<$ty>()
                    .map_err(|e| format_err(Self::KIND, format!("{text:?}: {e}")))
            }

            fn to_sql(&self) -> SqlValue {
                SqlValue::Blob(self.to_bytes())
            }

            fn from_sql(value: &SqlValue) -> SettingsResult<Self> {
                match value {
                    SqlValue::Blob(b) => Self::from_bytes(b),
                    other => Err(format_err(Self::KIND, format!("unexpected column {other:?}"))),
                }
            }
        }
    };
}

signed_setting!(i16, ValueKind::Int16);
signed_setting!(i32, ValueKind::Int32);
signed_setting!(i64, ValueKind::Int64);
unsigned_setting!(u16, ValueKind::UInt16);
unsigned_setting!(u32, ValueKind::UInt32);
unsigned_setting!(u64, ValueKind::UInt64);

impl SettingValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> SettingsResult<Self> {
        Ok(f32::from_le_bytes(fixed(Self::KIND, bytes)?))
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: &str) -> SettingsResult<Self> {
        text.trim()
            .parse::<f32>()
            .map_err(|e| format_err(Self::KIND, format!("{text:?}: {e}")))
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Real(f64::from(*self))
    }

    fn from_sql(value: &SqlValue) -> SettingsResult<Self> {
        match value {
            SqlValue::Real(r) => Ok(*r as f32),
            SqlValue::Integer(i) => Ok(*i as f32),
            // SQLite stores a bound NaN as NULL.
            SqlValue::Null => Ok(f32::NAN),
            other => Err(format_err(Self::KIND, format!("unexpected column {other:?}"))),
        }
    }
}

impl SettingValue for f64 {
    const KIND: ValueKind = ValueKind::Double;

    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> SettingsResult<Self> {
        Ok(f64::from_le_bytes(fixed(Self::KIND, bytes)?))
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: &str) -> SettingsResult<Self> {
        text.trim()
            .parse::<f64>()
            .map_err(|e| format_err(Self::KIND, format!("{text:?}: {e}")))
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Real(*self)
    }

    fn from_sql(value: &SqlValue) -> SettingsResult<Self> {
        match value {
            SqlValue::Real(r) => Ok(*r),
            SqlValue::Integer(i) => Ok(*i as f64),
            SqlValue::Null => Ok(f64::NAN),
            other => Err(format_err(Self::KIND, format!("unexpected column {other:?}"))),
        }
    }
}

impl SettingValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> SettingsResult<Self> {
        String::from_utf8(bytes.to_vec()).map_err(|e| format_err(Self::KIND, e))
    }

    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: &str) -> SettingsResult<Self> {
        Ok(text.to_string())
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }

    fn from_sql(value: &SqlValue) -> SettingsResult<Self> {
        match value {
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Null => Ok(String::new()),
            other => Err(format_err(Self::KIND, format!("unexpected column {other:?}"))),
        }
    }
}

impl SettingValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::ByteArray;

    fn to_bytes(&self) -> Vec<u8> {
        self.clone()
    }

    fn from_bytes(bytes: &[u8]) -> SettingsResult<Self> {
        Ok(bytes.to_vec())
    }

    // Markup stores the raw bytes as UTF-8 text; non-UTF-8 payloads are lossy.
    fn to_text(&self) -> String {
        String::from_utf8_lossy(self).into_owned()
    }

    fn from_text(text: &str) -> SettingsResult<Self> {
        Ok(text.as_bytes().to_vec())
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Blob(self.clone())
    }

    fn from_sql(value: &SqlValue) -> SettingsResult<Self> {
        match value {
            SqlValue::Blob(b) => Ok(b.clone()),
            SqlValue::Text(s) => Ok(s.as_bytes().to_vec()),
            SqlValue::Null => Ok(Vec::new()),
            other => Err(format_err(Self::KIND, format!("unexpected column {other:?}"))),
        }
    }
}

impl SettingValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn to_bytes(&self) -> Vec<u8> {
        vec![u8::from(*self)]
    }

    fn from_bytes(bytes: &[u8]) -> SettingsResult<Self> {
        match bytes {
            [0] => Ok(false),
            [1] => Ok(true),
            other => Err(format_err(Self::KIND, format!("invalid payload {other:?}"))),
        }
    }

    fn to_text(&self) -> String {
        let text = if *self { "True" } else { "False" };
        text.to_string()
    }

    fn from_text(text: &str) -> SettingsResult<Self> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
            Ok(true)
        } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
            Ok(false)
        } else {
            Err(format_err(Self::KIND, format!("{text:?} is not a boolean")))
        }
    }

    fn to_sql(&self) -> SqlValue {
        SqlValue::Integer(i64::from(*self))
    }

    fn from_sql(value: &SqlValue) -> SettingsResult<Self> {
        match value {
            SqlValue::Integer(i) => Ok(*i != 0),
            other => Err(format_err(Self::KIND, format!("unexpected column {other:?}"))),
        }
    }
}

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("static regex"));

/// Variable and group names become XML element names, so both backends accept
/// the same restricted identifier alphabet.
pub fn validate_name(name: &str) -> SettingsResult<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(SettingsError::InvalidName(name.to_string()))
    }
}
