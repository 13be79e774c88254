//! Settings-file handle.
//!
//! A [`SettingsFile`] binds one path to one storage mode for its whole
//! lifetime. With [`StoreMode::Auto`] the mode is picked by sniffing the file:
//! the SQLite header wins, then well-formed XML; anything else is refused.
//!
//! Every forwarded call runs inside the handle's `settings_file` tracing span,
//! so backend log lines carry the path and mode they belong to.

use crate::core::error::{SettingsError, SettingsResult};
use crate::core::record::TypedRecord;
use crate::core::sniff;
use crate::core::value::{SettingValue, ValueKind};
use crate::modes::{Mode, SqliteMode, XmlMode, sqlite, xml};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{Span, info_span, warn};

/// Concrete storage mode of an opened handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
pub enum StoreKind {
    /// Table store: one SQLite table per value kind.
    Sqlite,
    /// Markup store: one XML document.
    Xml,
}

impl StoreKind {
    pub fn name(self) -> &'static str {
        match self {
            StoreKind::Sqlite => sqlite::MODE_NAME,
            StoreKind::Xml => xml::MODE_NAME,
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Requested mode at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreMode {
    #[default]
    Auto,
    Sqlite,
    Xml,
}

impl From<StoreKind> for StoreMode {
    fn from(kind: StoreKind) -> Self {
        match kind {
            StoreKind::Sqlite => StoreMode::Sqlite,
            StoreKind::Xml => StoreMode::Xml,
        }
    }
}

/// Sniff an existing file.
pub fn detect(path: &Path) -> SettingsResult<StoreKind> {
    if sniff::is_sqlite_file(path) {
        Ok(StoreKind::Sqlite)
    } else if sniff::is_xml_file(path) {
        Ok(StoreKind::Xml)
    } else {
        Err(SettingsError::UnknownFormat(path.to_path_buf()))
    }
}

#[derive(Debug)]
enum Backend {
    Sqlite(SqliteMode),
    Xml(XmlMode),
}

macro_rules! with_backend {
    ($self:ident, $mode:ident => $body:expr) => {{
        let _entered = $self.span.enter();
        match &$self.backend {
            Backend::Sqlite($mode) => $body,
            Backend::Xml($mode) => $body,
        }
    }};
}

macro_rules! with_backend_mut {
    ($self:ident, $mode:ident => $body:expr) => {{
        let _entered = $self.span.enter();
        match &mut $self.backend {
            Backend::Sqlite($mode) => $body,
            Backend::Xml($mode) => $body,
        }
    }};
}

#[derive(Debug)]
pub struct SettingsFile {
    path: PathBuf,
    kind: StoreKind,
    backend: Backend,
    span: Span,
}

impl SettingsFile {
    /// Bind `path` to a mode. Nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>, mode: StoreMode) -> SettingsResult<Self> {
        let path = path.into();
        let kind = match mode {
            StoreMode::Auto => detect(&path)?,
            StoreMode::Sqlite => StoreKind::Sqlite,
            StoreMode::Xml => StoreKind::Xml,
        };
        let backend = match kind {
            StoreKind::Sqlite => Backend::Sqlite(SqliteMode::new()),
            StoreKind::Xml => Backend::Xml(XmlMode::new()),
        };
        let span = info_span!("settings_file", path = %path.display(), mode = kind.name());
        Ok(Self {
            path,
            kind,
            backend,
            span,
        })
    }

    /// `new` followed by `open`.
    pub fn open_path(path: impl Into<PathBuf>, mode: StoreMode) -> SettingsResult<Self> {
        let mut file = Self::new(path, mode)?;
        file.open()?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component of the path.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn last_modified(&self) -> SettingsResult<SystemTime> {
        Ok(fs::metadata(&self.path)?.modified()?)
    }

    pub fn mode(&self) -> StoreKind {
        self.kind
    }

    pub fn open(&mut self) -> SettingsResult<()> {
        let path = self.path.clone();
        with_backend_mut!(self, m => m.open(&path))
    }

    pub fn close(&mut self) -> SettingsResult<()> {
        with_backend_mut!(self, m => m.close())
    }

    pub fn is_open(&self) -> bool {
        with_backend!(self, m => m.is_open())
    }

    pub fn set_auto_save(&mut self, auto_save: bool) {
        with_backend_mut!(self, m => m.set_auto_save(auto_save))
    }

    pub fn save(&mut self) -> SettingsResult<()> {
        with_backend_mut!(self, m => m.save())
    }

    pub fn contains<T: SettingValue>(&self, name: &str) -> SettingsResult<bool> {
        with_backend!(self, m => m.contains::<T>(name))
    }

    pub fn add<T: SettingValue>(
        &mut self,
        name: &str,
        value: T,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool> {
        with_backend_mut!(self, m => m.add(name, &value, description, group))
    }

    pub fn set<T: SettingValue>(&mut self, name: &str, value: T) -> SettingsResult<bool> {
        with_backend_mut!(self, m => m.set(name, &value))
    }

    pub fn set_default<T: SettingValue>(&mut self, name: &str, default: T) -> SettingsResult<bool> {
        with_backend_mut!(self, m => m.set_default(name, &default))
    }

    pub fn edit<T: SettingValue>(
        &mut self,
        name: &str,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool> {
        with_backend_mut!(self, m => m.edit::<T>(name, description, group))
    }

    /// Current value, or the type's zero value when `name` is not stored.
    /// Use [`SettingsFile::try_get`] to tell the two apart.
    pub fn get<T: SettingValue>(&self, name: &str) -> SettingsResult<T> {
        Ok(self.try_get(name)?.unwrap_or_default())
    }

    pub fn try_get<T: SettingValue>(&self, name: &str) -> SettingsResult<Option<T>> {
        with_backend!(self, m => m.get::<T>(name))
    }

    pub fn delete<T: SettingValue>(&mut self, name: &str) -> SettingsResult<bool> {
        with_backend_mut!(self, m => m.delete::<T>(name))
    }

    pub fn get_all<T: SettingValue>(&self) -> SettingsResult<Vec<TypedRecord>> {
        self.get_all_kind(T::KIND)
    }

    pub fn get_all_kind(&self, kind: ValueKind) -> SettingsResult<Vec<TypedRecord>> {
        with_backend!(self, m => m.get_all(kind))
    }

    pub fn get_all_types(&self) -> SettingsResult<Vec<TypedRecord>> {
        with_backend!(self, m => m.get_all_types())
    }

    pub fn get_all_metadata(&self) -> SettingsResult<Vec<TypedRecord>> {
        self.get_all_kind(ValueKind::MetaData)
    }

    pub fn get_metadata(&self, key: &str) -> SettingsResult<Option<String>> {
        with_backend!(self, m => m.get_metadata(key))
    }

    pub fn import_record(&mut self, record: &TypedRecord) -> SettingsResult<()> {
        with_backend_mut!(self, m => m.import_record(record))
    }

    pub fn update_migration_status(&mut self) -> SettingsResult<()> {
        with_backend_mut!(self, m => m.update_migration_status())
    }
}

impl Drop for SettingsFile {
    fn drop(&mut self) {
        if self.is_open()
            && let Err(e) = self.close()
        {
            warn!(path = %self.path.display(), error = %e, "failed to close settings file on drop");
        }
    }
}
