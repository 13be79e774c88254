//! Whole-file migration between settings files.
//!
//! Both walkers read every variable of a source as [`TypedRecord`]s and replay
//! them into a destination through [`SettingsFile::import_record`], then stamp
//! the destination with migration metadata. The destination is closed on every
//! exit path; records already imported before a failure stay imported.

use crate::core::error::{SettingsError, SettingsResult};
use crate::core::record::{DEFAULT_GROUP, TypedRecord};
use crate::core::sniff;
use crate::core::store::SettingsFile;
use crate::core::value::{SettingValue, ValueKind};
use crate::modes::xml_tree::XmlElement;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MigrationReport {
    pub records_read: usize,
    pub records_imported: usize,
}

/// Copies one settings file into another of the other mode.
#[derive(Debug)]
pub struct CrossModeMigration {
    source: SettingsFile,
    destination: SettingsFile,
}

impl CrossModeMigration {
    pub fn new(source: SettingsFile, destination: SettingsFile) -> SettingsResult<Self> {
        if source.mode() == destination.mode() {
            return Err(SettingsError::SameMode);
        }
        // Opening a missing source would create an empty one.
        if !source.path().exists() {
            return Err(SettingsError::UnknownFormat(source.path().to_path_buf()));
        }
        Ok(Self {
            source,
            destination,
        })
    }

    pub fn migrate(mut self) -> SettingsResult<MigrationReport> {
        info!(
            source = %self.source.path().display(),
            destination = %self.destination.path().display(),
            from = %self.source.mode(),
            to = %self.destination.mode(),
            "starting cross-mode migration"
        );

        self.source.open()?;
        let read = self.source.get_all_types();
        let closed = self.source.close();
        let records = read?;
        closed?;

        replay(&mut self.destination, &records)
    }
}

/// Legacy `XmlSettings` section names and the kinds they map to.
const LEGACY_SECTIONS: [(&str, ValueKind); 11] = [
    ("Int16", ValueKind::Int16),
    ("int", ValueKind::Int32),
    ("long", ValueKind::Int64),
    ("UInt16", ValueKind::UInt16),
    ("UInt32", ValueKind::UInt32),
    ("UInt64", ValueKind::UInt64),
    ("float", ValueKind::Float),
    ("double", ValueKind::Double),
    ("string", ValueKind::String),
    ("byte", ValueKind::ByteArray),
    ("boolean", ValueKind::Boolean),
];

const LEGACY_BODY: &str = "body";
const LEGACY_DEFAULT_ATTR: &str = "default";

/// Imports a legacy `XmlSettings` document into a settings file.
///
/// ```xml
/// <settings>
///   <body>
///     <int>
///       <port default="80">8080</port>
///     </int>
///   </body>
/// </settings>
/// ```
///
/// Every imported variable lands in the `default` group with its own name as
/// description.
#[derive(Debug)]
pub struct LegacyXmlImport {
    xml_path: PathBuf,
    destination: SettingsFile,
}

impl LegacyXmlImport {
    pub fn new(xml_path: impl Into<PathBuf>, destination: SettingsFile) -> SettingsResult<Self> {
        let xml_path = xml_path.into();
        if !sniff::is_xml_file(&xml_path) {
            error!(path = %xml_path.display(), "not a valid XmlSettings file");
            return Err(SettingsError::UnknownFormat(xml_path));
        }
        Ok(Self {
            xml_path,
            destination,
        })
    }

    pub fn xml_path(&self) -> &Path {
        &self.xml_path
    }

    /// Parse the legacy document without touching the destination.
    pub fn read_records(&self) -> SettingsResult<Vec<TypedRecord>> {
        let content = fs::read_to_string(&self.xml_path)?;
        let root = XmlElement::parse(&content)?;
        legacy_records(&root)
    }

    pub fn migrate(mut self) -> SettingsResult<MigrationReport> {
        info!(
            source = %self.xml_path.display(),
            destination = %self.destination.path().display(),
            to = %self.destination.mode(),
            "starting XmlSettings import"
        );
        let records = self.read_records()?;
        replay(&mut self.destination, &records)
    }
}

fn legacy_records(root: &XmlElement) -> SettingsResult<Vec<TypedRecord>> {
    let Some(body) = root.find(LEGACY_BODY) else {
        warn!("XmlSettings document has no <body>, nothing to import");
        return Ok(Vec::new());
    };
    let per_section = LEGACY_SECTIONS
        .par_iter()
        .map(|(section, kind)| match body.child(section) {
            Some(el) => legacy_section(el, *kind),
            None => Ok(Vec::new()),
        })
        .collect::<SettingsResult<Vec<_>>>()?;
    Ok(per_section.into_iter().flatten().collect())
}

fn legacy_section(section: &XmlElement, kind: ValueKind) -> SettingsResult<Vec<TypedRecord>> {
    section
        .children
        .iter()
        .map(|var| {
            crate::dispatch_kind!(kind, T => legacy_record::<T>(var),
                meta => Err(SettingsError::Format(
                    "metadata has no legacy section".to_string()
                )))
        })
        .collect()
}

fn legacy_record<T: SettingValue>(var: &XmlElement) -> SettingsResult<TypedRecord> {
    let value = T::from_text(&var.text)?;
    let default = match var.attribute(LEGACY_DEFAULT_ATTR) {
        Some(text) => T::from_text(text)?,
        None => value.clone(),
    };
    Ok(TypedRecord::from_values(
        var.name.as_str(),
        DEFAULT_GROUP,
        &value,
        &default,
        var.name.as_str(),
    ))
}

fn replay(destination: &mut SettingsFile, records: &[TypedRecord]) -> SettingsResult<MigrationReport> {
    let mut report = MigrationReport {
        records_read: records.len(),
        records_imported: 0,
    };
    let outcome = import_all(destination, records, &mut report);
    let closed = destination.close();

    match outcome {
        Ok(()) => {
            closed?;
            info!(
                read = report.records_read,
                imported = report.records_imported,
                "migration finished"
            );
            Ok(report)
        }
        Err(e) => {
            error!(
                imported = report.records_imported,
                read = report.records_read,
                error = %e,
                "migration failed; destination left partially written"
            );
            Err(e)
        }
    }
}

fn import_all(
    destination: &mut SettingsFile,
    records: &[TypedRecord],
    report: &mut MigrationReport,
) -> SettingsResult<()> {
    destination.open()?;
    destination.set_auto_save(false);
    for record in records {
        debug!(kind = %record.kind(), name = record.name(), "replaying");
        destination.import_record(record)?;
        report.records_imported += 1;
    }
    destination.update_migration_status()
}
