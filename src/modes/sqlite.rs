//! SQLite-backed settings files.
//!
//! Each value kind owns one table, created on first `add`. Rows are
//! `(VariableName, VariableGroup, VariableValue, VariableDefault, VariableDesc)`;
//! the `_MetaData` table has no default column. Every mutation checks existence
//! first, so duplicate names can only appear if the file is edited externally.

use crate::core::db;
use crate::core::error::{SettingsError, SettingsResult};
use crate::core::record::TypedRecord;
use crate::core::schemas;
use crate::core::value::{SettingValue, ValueKind, validate_name};
use crate::modes::Mode;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MODE_NAME: &str = "SQLite";

#[derive(Debug, Default)]
pub struct SqliteMode {
    conn: Option<Connection>,
    path: Option<PathBuf>,
}

impl SqliteMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> SettingsResult<&Connection> {
        self.conn.as_ref().ok_or(SettingsError::NotOpen)
    }

    fn ensure_table(&self, kind: ValueKind) -> SettingsResult<()> {
        self.conn()?.execute(&schemas::create_table(kind), [])?;
        Ok(())
    }

    fn table_exists(&self, kind: ValueKind) -> SettingsResult<bool> {
        db::table_exists(self.conn()?, kind.section())
    }

    fn row_exists(&self, kind: ValueKind, name: &str) -> SettingsResult<bool> {
        if !self.table_exists(kind)? {
            return Ok(false);
        }
        let sql = format!(
            "SELECT COUNT(1) FROM {} WHERE VariableName = ?1",
            schemas::table(kind)
        );
        let count: i64 = self.conn()?.query_row(&sql, [name], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn update_column(
        &self,
        kind: ValueKind,
        column: &str,
        name: &str,
        value: SqlValue,
    ) -> SettingsResult<bool> {
        if !self.row_exists(kind, name)? {
            return Ok(false);
        }
        let sql = format!(
            "UPDATE {} SET {column} = ?1 WHERE VariableName = ?2",
            schemas::table(kind)
        );
        self.conn()?.execute(&sql, params![value, name])?;
        Ok(true)
    }

    fn update_group_and_description(
        &self,
        kind: ValueKind,
        name: &str,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool> {
        validate_name(group)?;
        if !self.row_exists(kind, name)? {
            return Ok(false);
        }
        let sql = format!(
            "UPDATE {} SET VariableGroup = ?1, VariableDesc = ?2 WHERE VariableName = ?3",
            schemas::table(kind)
        );
        self.conn()?.execute(&sql, params![group, description, name])?;
        Ok(true)
    }

    fn delete_row(&self, kind: ValueKind, name: &str) -> SettingsResult<bool> {
        if !self.row_exists(kind, name)? {
            return Ok(false);
        }
        let sql = format!("DELETE FROM {} WHERE VariableName = ?1", schemas::table(kind));
        self.conn()?.execute(&sql, [name])?;
        Ok(true)
    }

    fn read_typed<T: SettingValue>(&self) -> SettingsResult<Vec<TypedRecord>> {
        let sql = format!(
            "SELECT VariableName, VariableGroup, VariableValue, VariableDefault, VariableDesc \
             FROM {} ORDER BY rowid",
            schemas::table(T::KIND)
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, SqlValue>(2)?,
                    row.get::<_, SqlValue>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(name, group, value, default, desc)| {
                let value = T::from_sql(&value)?;
                let default = T::from_sql(&default)?;
                Ok(TypedRecord::from_values(
                    name,
                    group.unwrap_or_default(),
                    &value,
                    &default,
                    desc.unwrap_or_default(),
                ))
            })
            .collect()
    }

    fn read_metadata(&self) -> SettingsResult<Vec<TypedRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT VariableName, VariableGroup, VariableValue, VariableDesc \
             FROM \"_MetaData\" ORDER BY rowid",
        )?;
        let records = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let group: Option<String> = row.get(1)?;
                let value: Option<String> = row.get(2)?;
                let desc: Option<String> = row.get(3)?;
                Ok(TypedRecord::metadata(
                    name,
                    group.unwrap_or_default(),
                    &value.unwrap_or_default(),
                    desc.unwrap_or_default(),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

impl SqliteMode {
    fn prepare_metadata(&mut self, path: &Path, is_new: bool) -> SettingsResult<()> {
        self.ensure_table(ValueKind::MetaData)?;
        if is_new {
            info!(path = %path.display(), "creating SQLite settings file");
            self.seed_metadata()
        } else {
            debug!(path = %path.display(), "opening SQLite settings file");
            self.touch_metadata()
        }
    }
}

impl Mode for SqliteMode {
    fn open(&mut self, path: &Path) -> SettingsResult<()> {
        let is_new = !path.exists();
        let conn = db::db_connect(path)?;
        self.conn = Some(conn);
        self.path = Some(path.to_path_buf());

        let prepared = self.prepare_metadata(path, is_new);
        if prepared.is_err() {
            // Not a usable database: stay closed.
            self.conn = None;
            self.path = None;
        }
        prepared
    }

    fn close(&mut self) -> SettingsResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| SettingsError::Sqlite(e))?;
            debug!(path = ?self.path, "closed SQLite settings file");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn mode_name(&self) -> &'static str {
        MODE_NAME
    }

    fn contains<T: SettingValue>(&self, name: &str) -> SettingsResult<bool> {
        self.row_exists(T::KIND, name)
    }

    fn add<T: SettingValue>(
        &mut self,
        name: &str,
        value: &T,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool> {
        validate_name(name)?;
        validate_name(group)?;
        self.ensure_table(T::KIND)?;
        if self.row_exists(T::KIND, name)? {
            warn!(kind = %T::KIND, name, "variable already exists, not added");
            return Ok(false);
        }
        let sql = format!(
            "INSERT INTO {} (VariableName, VariableGroup, VariableValue, VariableDefault, VariableDesc) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            schemas::table(T::KIND)
        );
        let encoded = value.to_sql();
        self.conn()?.execute(
            &sql,
            params![name, group, encoded, encoded, description],
        )?;
        debug!(kind = %T::KIND, name, group, "added variable");
        Ok(true)
    }

    fn set<T: SettingValue>(&mut self, name: &str, value: &T) -> SettingsResult<bool> {
        self.update_column(T::KIND, "VariableValue", name, value.to_sql())
    }

    fn set_default<T: SettingValue>(&mut self, name: &str, default: &T) -> SettingsResult<bool> {
        self.update_column(T::KIND, "VariableDefault", name, default.to_sql())
    }

    fn edit<T: SettingValue>(
        &mut self,
        name: &str,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool> {
        self.update_group_and_description(T::KIND, name, description, group)
    }

    fn get<T: SettingValue>(&self, name: &str) -> SettingsResult<Option<T>> {
        if !self.table_exists(T::KIND)? {
            return Ok(None);
        }
        let sql = format!(
            "SELECT VariableValue FROM {} WHERE VariableName = ?1 LIMIT 1",
            schemas::table(T::KIND)
        );
        let raw: Option<SqlValue> = self
            .conn()?
            .query_row(&sql, [name], |row| row.get(0))
            .optional()?;
        raw.map(|v| T::from_sql(&v)).transpose()
    }

    fn delete<T: SettingValue>(&mut self, name: &str) -> SettingsResult<bool> {
        let deleted = self.delete_row(T::KIND, name)?;
        if deleted {
            debug!(kind = %T::KIND, name, "deleted variable");
        }
        Ok(deleted)
    }

    fn get_all(&self, kind: ValueKind) -> SettingsResult<Vec<TypedRecord>> {
        if !self.table_exists(kind)? {
            return Ok(Vec::new());
        }
        crate::dispatch_kind!(kind, T => self.read_typed::<T>(), meta => self.read_metadata())
    }

    fn add_metadata(
        &mut self,
        name: &str,
        group: &str,
        value: &str,
        description: &str,
    ) -> SettingsResult<bool> {
        validate_name(name)?;
        validate_name(group)?;
        self.ensure_table(ValueKind::MetaData)?;
        if self.row_exists(ValueKind::MetaData, name)? {
            return Ok(false);
        }
        self.conn()?.execute(
            "INSERT INTO \"_MetaData\" (VariableName, VariableGroup, VariableValue, VariableDesc) \
             VALUES (?1, ?2, ?3, ?4)",
            params![name, group, value, description],
        )?;
        Ok(true)
    }

    fn set_metadata(&mut self, name: &str, value: &str) -> SettingsResult<bool> {
        self.update_column(
            ValueKind::MetaData,
            "VariableValue",
            name,
            SqlValue::Text(value.to_string()),
        )
    }

    fn edit_metadata(
        &mut self,
        name: &str,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool> {
        self.update_group_and_description(ValueKind::MetaData, name, description, group)
    }

    fn get_metadata(&self, name: &str) -> SettingsResult<Option<String>> {
        if !self.table_exists(ValueKind::MetaData)? {
            return Ok(None);
        }
        let value: Option<Option<String>> = self
            .conn()?
            .query_row(
                "SELECT VariableValue FROM \"_MetaData\" WHERE VariableName = ?1 LIMIT 1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.map(Option::unwrap_or_default))
    }
}
