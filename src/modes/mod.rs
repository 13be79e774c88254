//! Storage modes: the backend contract and its SQLite and XML implementations.
//!
//! A [`Mode`] persists typed variables keyed by `(kind, name)`. Names are
//! unique per kind, not globally. Absence is never an error: mutators answer
//! `Ok(false)` and [`Mode::get`] answers `Ok(None)`. Errors are reserved for
//! I/O, malformed content and rejected names.
//!
//! The trait is generic over [`SettingValue`] so a single code path serves all
//! eleven value kinds; bulk transfer goes through [`TypedRecord`] and the
//! shared upsert in [`Mode::import_record`].

pub mod metadata;
pub mod sqlite;
pub mod xml;
pub mod xml_tree;

use crate::core::error::{SettingsError, SettingsResult};
use crate::core::record::TypedRecord;
use crate::core::time;
use crate::core::value::{SettingValue, ValueKind};
use std::path::Path;
use tracing::debug;

pub use sqlite::SqliteMode;
pub use xml::XmlMode;

pub trait Mode {
    /// Acquire the file. A missing file is created and seeded with
    /// provenance metadata; an existing one gets its last-access keys refreshed.
    fn open(&mut self, path: &Path) -> SettingsResult<()>;
    fn close(&mut self) -> SettingsResult<()>;
    fn is_open(&self) -> bool;

    /// Name recorded in the `SSM_*Mode` metadata keys.
    fn mode_name(&self) -> &'static str;

    fn contains<T: SettingValue>(&self, name: &str) -> SettingsResult<bool>;

    /// Stores `value` as both current and default. `Ok(false)` if `name` exists.
    fn add<T: SettingValue>(
        &mut self,
        name: &str,
        value: &T,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool>;

    /// Replaces the current value only.
    fn set<T: SettingValue>(&mut self, name: &str, value: &T) -> SettingsResult<bool>;

    fn set_default<T: SettingValue>(&mut self, name: &str, default: &T) -> SettingsResult<bool>;

    /// Replaces description and group; the value is untouched.
    fn edit<T: SettingValue>(
        &mut self,
        name: &str,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool>;

    fn get<T: SettingValue>(&self, name: &str) -> SettingsResult<Option<T>>;

    fn delete<T: SettingValue>(&mut self, name: &str) -> SettingsResult<bool>;

    /// Every variable of `kind`, in store order. Empty when the section is absent.
    fn get_all(&self, kind: ValueKind) -> SettingsResult<Vec<TypedRecord>>;

    fn add_metadata(
        &mut self,
        name: &str,
        group: &str,
        value: &str,
        description: &str,
    ) -> SettingsResult<bool>;
    fn set_metadata(&mut self, name: &str, value: &str) -> SettingsResult<bool>;
    fn edit_metadata(&mut self, name: &str, description: &str, group: &str)
    -> SettingsResult<bool>;
    fn get_metadata(&self, name: &str) -> SettingsResult<Option<String>>;

    /// Only meaningful for modes that buffer the whole file in memory.
    fn set_auto_save(&mut self, _auto_save: bool) {}

    fn save(&mut self) -> SettingsResult<()> {
        Ok(())
    }

    /// Metadata first, then each variable kind in [`ValueKind::ALL`] order.
    fn get_all_types(&self) -> SettingsResult<Vec<TypedRecord>> {
        let mut records = Vec::new();
        for kind in ValueKind::ALL {
            records.extend(self.get_all(kind)?);
        }
        Ok(records)
    }

    /// Upsert one record: add when absent, otherwise set + edit. The stored
    /// default is overwritten with the record's default either way.
    fn import_record(&mut self, record: &TypedRecord) -> SettingsResult<()> {
        debug!(kind = %record.kind(), name = record.name(), "importing record");
        crate::dispatch_kind!(record.kind(), T => self.import_typed::<T>(record),
            meta => self.import_metadata(record))
    }

    fn import_typed<T: SettingValue>(&mut self, record: &TypedRecord) -> SettingsResult<()> {
        let value: T = record.decode_value()?;
        let default: T = record.decode_default()?;
        if self.contains::<T>(record.name())? {
            self.set(record.name(), &value)?;
            self.edit::<T>(record.name(), record.description(), record.group())?;
        } else {
            self.add(record.name(), &value, record.description(), record.group())?;
        }
        self.set_default(record.name(), &default)?;
        Ok(())
    }

    fn import_metadata(&mut self, record: &TypedRecord) -> SettingsResult<()> {
        let value = record.text_value()?;
        if !self.add_metadata(record.name(), record.group(), &value, record.description())? {
            self.set_metadata(record.name(), &value)?;
            self.edit_metadata(record.name(), record.description(), record.group())?;
        }
        Ok(())
    }

    /// Set a metadata key, creating it in its canonical group if needed.
    fn put_metadata(&mut self, key: &str, value: &str) -> SettingsResult<()> {
        if !self.add_metadata(key, metadata::group(key), value, metadata::description(key))? {
            self.set_metadata(key, value)?;
        }
        Ok(())
    }

    /// Provenance for a freshly created file.
    fn seed_metadata(&mut self) -> SettingsResult<()> {
        let version = time::app_version();
        let now = time::now_epoch();
        let mode = self.mode_name();
        for key in metadata::SEEDED_KEYS {
            let value = match key {
                metadata::CREATION_APP_VERSION | metadata::LAST_ACCESS_APP_VERSION => {
                    version.as_str()
                }
                metadata::CREATION_FORMAT_VERSION | metadata::LAST_ACCESS_FORMAT_VERSION => {
                    time::FORMAT_VERSION
                }
                metadata::CREATION_TIMESTAMP | metadata::LAST_LOADED_TIMESTAMP => now.as_str(),
                _ => mode,
            };
            self.add_metadata(key, metadata::group(key), value, metadata::description(key))?;
        }
        Ok(())
    }

    /// Refresh the last-access family; creation keys are left alone.
    fn touch_metadata(&mut self) -> SettingsResult<()> {
        let version = time::app_version();
        let now = time::now_epoch();
        let mode = self.mode_name();
        for key in metadata::LAST_ACCESS_KEYS {
            let value = match key {
                metadata::LAST_ACCESS_APP_VERSION => version.as_str(),
                metadata::LAST_ACCESS_FORMAT_VERSION => time::FORMAT_VERSION,
                metadata::LAST_LOADED_TIMESTAMP => now.as_str(),
                _ => mode,
            };
            self.put_metadata(key, value)?;
        }
        Ok(())
    }

    /// Stamp the migration time and bump the migration counter.
    fn update_migration_status(&mut self) -> SettingsResult<()> {
        self.put_metadata(metadata::LAST_MIGRATION, &time::now_epoch())?;

        let count_key = metadata::MIGRATION_COUNT;
        if !self.add_metadata(
            count_key,
            metadata::group(count_key),
            "1",
            metadata::description(count_key),
        )? {
            let current = self.get_metadata(count_key)?.unwrap_or_default();
            let total: u64 = current.trim().parse().map_err(|_| {
                SettingsError::Format(format!("{count_key} is not a number: {current:?}"))
            })?;
            self.set_metadata(count_key, &(total + 1).to_string())?;
        }
        self.touch_metadata()
    }
}
