//! XML-backed settings files.
//!
//! Layout: `<SSM>` → one element per kind section → one element per group →
//! one element per variable with `value`, `default` and `description` leaves
//! (metadata variables have no `default`). The whole document lives in memory
//! between `open` and `close`; with auto-save on, every mutation rewrites the
//! file.

use crate::core::error::{SettingsError, SettingsResult};
use crate::core::record::TypedRecord;
use crate::core::value::{SettingValue, ValueKind, validate_name};
use crate::modes::Mode;
use crate::modes::xml_tree::XmlElement;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MODE_NAME: &str = "XML";
pub const ROOT_ELEMENT: &str = "SSM";

const VALUE: &str = "value";
const DEFAULT: &str = "default";
const DESCRIPTION: &str = "description";

#[derive(Debug)]
pub struct XmlMode {
    path: Option<PathBuf>,
    doc: Option<XmlElement>,
    auto_save: bool,
}

impl Default for XmlMode {
    fn default() -> Self {
        Self {
            path: None,
            doc: None,
            auto_save: true,
        }
    }
}

impl XmlMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn auto_save(&self) -> bool {
        self.auto_save
    }

    fn doc(&self) -> SettingsResult<&XmlElement> {
        self.doc.as_ref().ok_or(SettingsError::NotOpen)
    }

    fn doc_mut(&mut self) -> SettingsResult<&mut XmlElement> {
        self.doc.as_mut().ok_or(SettingsError::NotOpen)
    }

    fn persist(&mut self) -> SettingsResult<()> {
        if self.auto_save { self.save() } else { Ok(()) }
    }

    /// Run `f` with auto-save suspended, then persist once.
    fn deferred<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> SettingsResult<R>,
    ) -> SettingsResult<R> {
        let auto_save = std::mem::replace(&mut self.auto_save, false);
        let result = f(self);
        self.auto_save = auto_save;
        let out = result?;
        self.persist()?;
        Ok(out)
    }

    /// Group name and element of variable `name` under `kind`.
    fn find(&self, kind: ValueKind, name: &str) -> SettingsResult<Option<(&str, &XmlElement)>> {
        let Some(section) = self.doc()?.child(kind.section()) else {
            return Ok(None);
        };
        Ok(section
            .children
            .iter()
            .find_map(|group| group.child(name).map(|var| (group.name.as_str(), var))))
    }

    fn find_mut(&mut self, kind: ValueKind, name: &str) -> SettingsResult<Option<&mut XmlElement>> {
        let Some(section) = self.doc_mut()?.child_mut(kind.section()) else {
            return Ok(None);
        };
        Ok(section
            .children
            .iter_mut()
            .find_map(|group| group.child_mut(name)))
    }

    fn set_leaf(
        &mut self,
        kind: ValueKind,
        name: &str,
        leaf: &str,
        text: String,
    ) -> SettingsResult<bool> {
        let Some(var) = self.find_mut(kind, name)? else {
            return Ok(false);
        };
        var.child_or_insert(leaf).text = text;
        self.persist()?;
        Ok(true)
    }

    fn insert(&mut self, kind: ValueKind, group: &str, var: XmlElement) -> SettingsResult<()> {
        self.doc_mut()?
            .child_or_insert(kind.section())
            .child_or_insert(group)
            .children
            .push(var);
        self.persist()
    }

    fn remove(&mut self, kind: ValueKind, name: &str) -> SettingsResult<bool> {
        let root = self.doc_mut()?;
        let Some(section) = root.child_mut(kind.section()) else {
            return Ok(false);
        };
        let removed = section
            .children
            .iter_mut()
            .any(|group| group.remove_child(name).is_some());
        if !removed {
            return Ok(false);
        }
        prune(root);
        self.persist()?;
        Ok(true)
    }

    /// Description is patched in place; a group change re-creates the variable
    /// under the new group through the import path.
    fn edit_entry(
        &mut self,
        kind: ValueKind,
        name: &str,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool> {
        validate_name(group)?;
        let existing = match self.find(kind, name)? {
            None => return Ok(false),
            Some((current, _)) if current == group => None,
            Some((current, var)) => Some((
                record_of(kind, current, var)?,
                current.to_string(),
                var.clone(),
            )),
        };

        let Some((existing, from_group, original)) = existing else {
            return self.set_leaf(kind, name, DESCRIPTION, description.to_string());
        };

        debug!(%kind, name, from = existing.group(), to = group, "moving variable");
        let moved = TypedRecord::new(
            kind,
            name,
            group,
            existing.value().to_vec(),
            existing.default().to_vec(),
            description,
        );
        self.deferred(|mode| {
            mode.remove(kind, name)?;
            if let Err(e) = mode.import_record(&moved) {
                warn!(%kind, name, error = %e, "group move failed, restoring variable");
                mode.remove(kind, name)?;
                mode.insert(kind, &from_group, original)?;
                return Err(e);
            }
            Ok(())
        })?;
        Ok(true)
    }
}

impl Mode for XmlMode {
    fn open(&mut self, path: &Path) -> SettingsResult<()> {
        let is_new = !path.exists();
        let mut root = if is_new {
            info!(path = %path.display(), "creating XML settings file");
            XmlElement::new(ROOT_ELEMENT)
        } else {
            debug!(path = %path.display(), "opening XML settings file");
            let content = fs::read_to_string(path)?;
            let root = XmlElement::parse(&content)?;
            if root.name != ROOT_ELEMENT {
                return Err(SettingsError::Format(format!(
                    "{}: root element is <{}>, expected <{ROOT_ELEMENT}>",
                    path.display(),
                    root.name
                )));
            }
            root
        };
        root.text.clear();
        prune(&mut root);

        self.doc = Some(root);
        self.path = Some(path.to_path_buf());

        let auto_save = std::mem::replace(&mut self.auto_save, false);
        let result = if is_new {
            self.seed_metadata()
        } else {
            self.touch_metadata()
        };
        self.auto_save = auto_save;
        if let Err(e) = result {
            self.doc = None;
            return Err(e);
        }
        // The file exists on disk once open returns, whatever the auto-save mode.
        self.save()
    }

    fn close(&mut self) -> SettingsResult<()> {
        if self.doc.is_some() {
            self.save()?;
            self.doc = None;
            debug!(path = ?self.path, "closed XML settings file");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.doc.is_some()
    }

    fn mode_name(&self) -> &'static str {
        MODE_NAME
    }

    fn set_auto_save(&mut self, auto_save: bool) {
        self.auto_save = auto_save;
    }

    fn save(&mut self) -> SettingsResult<()> {
        let path = self.path.as_deref().ok_or(SettingsError::NotOpen)?;
        let content = self.doc()?.to_document()?;
        fs::write(path, content)?;
        Ok(())
    }

    fn contains<T: SettingValue>(&self, name: &str) -> SettingsResult<bool> {
        Ok(self.find(T::KIND, name)?.is_some())
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
        if self.contains::<T>(name)? {
            warn!(kind = %T::KIND, name, "variable already exists, not added");
            return Ok(false);
        }
        let text = value.to_text();
        let var = variable_element(name, text.clone(), Some(text), description);
        self.insert(T::KIND, group, var)?;
        debug!(kind = %T::KIND, name, group, "added variable");
        Ok(true)
    }

    fn set<T: SettingValue>(&mut self, name: &str, value: &T) -> SettingsResult<bool> {
        self.set_leaf(T::KIND, name, VALUE, value.to_text())
    }

    fn set_default<T: SettingValue>(&mut self, name: &str, default: &T) -> SettingsResult<bool> {
        self.set_leaf(T::KIND, name, DEFAULT, default.to_text())
    }

    fn edit<T: SettingValue>(
        &mut self,
        name: &str,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool> {
        self.edit_entry(T::KIND, name, description, group)
    }

    fn get<T: SettingValue>(&self, name: &str) -> SettingsResult<Option<T>> {
        match self.find(T::KIND, name)? {
            Some((_, var)) => Ok(Some(T::from_text(value_text(T::KIND, var)?)?)),
            None => Ok(None),
        }
    }

    fn delete<T: SettingValue>(&mut self, name: &str) -> SettingsResult<bool> {
        let deleted = self.remove(T::KIND, name)?;
        if deleted {
            debug!(kind = %T::KIND, name, "deleted variable");
        }
        Ok(deleted)
    }

    fn get_all(&self, kind: ValueKind) -> SettingsResult<Vec<TypedRecord>> {
        section_records(self.doc()?, kind)
    }

    fn get_all_types(&self) -> SettingsResult<Vec<TypedRecord>> {
        let root = self.doc()?;
        let per_kind = ValueKind::ALL
            .par_iter()
            .map(|kind| section_records(root, *kind))
            .collect::<SettingsResult<Vec<_>>>()?;
        Ok(per_kind.into_iter().flatten().collect())
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
        if self.find(ValueKind::MetaData, name)?.is_some() {
            return Ok(false);
        }
        let var = variable_element(name, value.to_string(), None, description);
        self.insert(ValueKind::MetaData, group, var)?;
        Ok(true)
    }

    fn set_metadata(&mut self, name: &str, value: &str) -> SettingsResult<bool> {
        self.set_leaf(ValueKind::MetaData, name, VALUE, value.to_string())
    }

    fn edit_metadata(
        &mut self,
        name: &str,
        description: &str,
        group: &str,
    ) -> SettingsResult<bool> {
        self.edit_entry(ValueKind::MetaData, name, description, group)
    }

    fn get_metadata(&self, name: &str) -> SettingsResult<Option<String>> {
        match self.find(ValueKind::MetaData, name)? {
            Some((_, var)) => Ok(Some(var.child_text(VALUE).unwrap_or_default().to_string())),
            None => Ok(None),
        }
    }
}

fn variable_element(
    name: &str,
    value: String,
    default: Option<String>,
    description: &str,
) -> XmlElement {
    let mut var = XmlElement::new(name);
    var.children.push(XmlElement::with_text(VALUE, value));
    if let Some(default) = default {
        var.children.push(XmlElement::with_text(DEFAULT, default));
    }
    var.children.push(XmlElement::with_text(DESCRIPTION, description));
    var
}

fn value_text(kind: ValueKind, var: &XmlElement) -> SettingsResult<&str> {
    var.child_text(VALUE).ok_or_else(|| {
        SettingsError::Format(format!("{kind} variable {} has no <{VALUE}>", var.name))
    })
}

fn typed_record<T: SettingValue>(group: &str, var: &XmlElement) -> SettingsResult<TypedRecord> {
    let value = T::from_text(value_text(T::KIND, var)?)?;
    let default = match var.child_text(DEFAULT) {
        Some(text) => T::from_text(text)?,
        None => value.clone(),
    };
    Ok(TypedRecord::from_values(
        var.name.as_str(),
        group,
        &value,
        &default,
        var.child_text(DESCRIPTION).unwrap_or_default(),
    ))
}

fn record_of(kind: ValueKind, group: &str, var: &XmlElement) -> SettingsResult<TypedRecord> {
    crate::dispatch_kind!(kind, T => typed_record::<T>(group, var),
        meta => Ok(TypedRecord::metadata(
            var.name.as_str(),
            group,
            var.child_text(VALUE).unwrap_or_default(),
            var.child_text(DESCRIPTION).unwrap_or_default(),
        )))
}

fn section_records(root: &XmlElement, kind: ValueKind) -> SettingsResult<Vec<TypedRecord>> {
    let Some(section) = root.child(kind.section()) else {
        return Ok(Vec::new());
    };
    let mut records = Vec::new();
    for group in &section.children {
        for var in &group.children {
            records.push(record_of(kind, &group.name, var)?);
        }
    }
    Ok(records)
}

/// Drop groups with no variables, then sections with no groups.
fn prune(root: &mut XmlElement) {
    for section in &mut root.children {
        section.children.retain(XmlElement::has_children);
    }
    root.children.retain(XmlElement::has_children);
}
