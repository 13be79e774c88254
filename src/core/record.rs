//! Backend-agnostic projection of one stored variable.

use crate::core::error::{SettingsError, SettingsResult};
use crate::core::value::{SettingValue, ValueKind};
use serde::Serialize;

/// Group assigned when the caller does not name one.
pub const DEFAULT_GROUP: &str = "default";

/// One variable as it travels between stores during export, import and migration.
///
/// `value` and `default` hold the record byte encoding of the variable's kind
/// (see [`SettingValue::to_bytes`]); metadata records carry UTF-8 text in both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedRecord {
    kind: ValueKind,
    name: String,
    group: String,
    value: Vec<u8>,
    default: Vec<u8>,
    description: String,
}

impl TypedRecord {
    pub fn new(
        kind: ValueKind,
        name: impl Into<String>,
        group: impl Into<String>,
        value: Vec<u8>,
        default: Vec<u8>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            group: group.into(),
            value,
            default,
            description: description.into(),
        }
    }

    /// Build a record from typed values.
    pub fn from_values<T: SettingValue>(
        name: impl Into<String>,
        group: impl Into<String>,
        value: &T,
        default: &T,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            T::KIND,
            name,
            group,
            value.to_bytes(),
            default.to_bytes(),
            description,
        )
    }

    /// Metadata records have no separate default.
    pub fn metadata(
        name: impl Into<String>,
        group: impl Into<String>,
        value: &str,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            ValueKind::MetaData,
            name,
            group,
            value.as_bytes().to_vec(),
            value.as_bytes().to_vec(),
            description,
        )
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn default(&self) -> &[u8] {
        &self.default
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn decode_value<T: SettingValue>(&self) -> SettingsResult<T> {
        self.check_kind(T::KIND)?;
        T::from_bytes(&self.value)
    }

    pub fn decode_default<T: SettingValue>(&self) -> SettingsResult<T> {
        self.check_kind(T::KIND)?;
        T::from_bytes(&self.default)
    }

    /// Metadata value as text.
    pub fn text_value(&self) -> SettingsResult<String> {
        String::from_utf8(self.value.clone())
            .map_err(|e| SettingsError::Format(format!("{}: {e}", self.name)))
    }

    /// Human-readable rendering of the current value, for listings.
    pub fn display_value(&self) -> String {
        render(self.kind, &self.value)
    }

    pub fn display_default(&self) -> String {
        render(self.kind, &self.default)
    }

    fn check_kind(&self, expected: ValueKind) -> SettingsResult<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(SettingsError::Format(format!(
                "record {} is {}, not {}",
                self.name, self.kind, expected
            )))
        }
    }
}

fn render(kind: ValueKind, bytes: &[u8]) -> String {
    let rendered = crate::dispatch_kind!(kind, T => T::from_bytes(bytes).map(|v| v.to_text()),
        meta => Ok(String::from_utf8_lossy(bytes).into_owned()));
    rendered.unwrap_or_else(|_| format!("<{} invalid bytes>", bytes.len()))
}
