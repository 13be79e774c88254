//! SSM: typed settings files backed by SQLite or XML.
//!
//! A settings file stores named variables of eleven value kinds (signed and
//! unsigned integers, floats, strings, byte arrays, booleans), each with a
//! current value, a default, a description and a group. The same API works
//! over two interchangeable on-disk formats, and whole files can be migrated
//! from one format to the other.
//!
//! # Example
//!
//! ```no_run
//! use ssm::core::store::{SettingsFile, StoreMode};
//!
//! # fn main() -> Result<(), ssm::core::error::SettingsError> {
//! let mut file = SettingsFile::new("app.db", StoreMode::Sqlite)?;
//! file.open()?;
//! file.add("port", 8080i32, "server port", "network")?;
//! file.set("port", 9090i32)?;
//! assert_eq!(file.get::<i32>("port")?, 9090);
//! file.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: value encodings, records, the [`SettingsFile`](core::store::SettingsFile)
//!   facade, migration, config and logging
//! - [`modes`]: the [`Mode`](modes::Mode) contract and its SQLite and XML backends

pub mod core;
pub mod modes;

use crate::core::config::SsmConfig;
use crate::core::migration::{CrossModeMigration, LegacyXmlImport};
use crate::core::output::{self, OutputFormat};
use crate::core::record::DEFAULT_GROUP;
use crate::core::store::{SettingsFile, StoreKind, StoreMode};
use crate::core::value::{SettingValue, ValueKind};
use crate::core::{logging, time};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

#[derive(Parser, Debug)]
#[clap(
    name = "ssm",
    version = env!("CARGO_PKG_VERSION"),
    about = "Typed settings files backed by SQLite or XML"
)]
struct Cli {
    /// Path to an ssm.toml (defaults to ./ssm.toml when present).
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level.
    #[clap(short, long, global = true)]
    verbose: bool,
    /// Output format.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
enum ModeArg {
    /// Sniff existing files; pick by extension for new ones.
    #[default]
    Auto,
    Sqlite,
    Xml,
}

#[derive(clap::Args, Debug)]
struct FileArgs {
    /// Settings file.
    file: PathBuf,
    /// Storage mode.
    #[clap(long, value_enum, default_value = "auto")]
    mode: ModeArg,
}

#[derive(clap::Args, Debug)]
struct VarArgs {
    #[clap(flatten)]
    file: FileArgs,
    /// Value kind (int16, int32, int64, uint16, uint32, uint64, float, double,
    /// string, bytes, bool).
    #[clap(value_parser = parse_kind)]
    kind: ValueKind,
    /// Variable name.
    name: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show file mode, timestamps and provenance metadata
    Info(FileArgs),
    /// List stored variables
    List {
        #[clap(flatten)]
        file: FileArgs,
        /// Only list this kind (`metadata` for provenance keys).
        #[clap(long, value_parser = parse_kind)]
        kind: Option<ValueKind>,
    },
    /// Print the current value of a variable
    Get(VarArgs),
    /// Add a variable; fails if it already exists
    Add {
        #[clap(flatten)]
        var: VarArgs,
        #[clap(allow_hyphen_values = true)]
        value: String,
        #[clap(short, long, default_value = "")]
        description: String,
        #[clap(short, long, default_value = DEFAULT_GROUP)]
        group: String,
    },
    /// Replace the current value of a variable
    Set {
        #[clap(flatten)]
        var: VarArgs,
        #[clap(allow_hyphen_values = true)]
        value: String,
        /// Replace the default instead of the current value.
        #[clap(long)]
        default: bool,
    },
    /// Change the description and group of a variable
    Edit {
        #[clap(flatten)]
        var: VarArgs,
        #[clap(short, long)]
        description: String,
        #[clap(short, long, default_value = DEFAULT_GROUP)]
        group: String,
    },
    /// Delete a variable
    Delete(VarArgs),
    /// Copy every variable of a settings file into a file of the other mode
    Migrate {
        source: PathBuf,
        destination: PathBuf,
        #[clap(long, value_enum)]
        to: StoreKind,
    },
    /// Import a legacy XmlSettings document
    ImportLegacy {
        xml: PathBuf,
        destination: PathBuf,
        #[clap(long, value_enum)]
        to: StoreKind,
    },
    /// Print version information
    Version,
}

fn parse_kind(input: &str) -> Result<ValueKind, String> {
    ValueKind::parse_cli(input).ok_or_else(|| format!("unknown value kind '{input}'"))
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = SsmConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.log.verbose = true;
    }
    logging::init(&config.log)?;

    let format = cli.format;
    match cli.command {
        Command::Version => {
            let version = time::app_version();
            match format {
                OutputFormat::Json => output::print_json(&json!({
                    "version": version,
                    "format_version": time::FORMAT_VERSION,
                }))?,
                OutputFormat::Text => {
                    println!("ssm {version} (format {})", time::FORMAT_VERSION)
                }
            }
        }
        Command::Info(args) => {
            let file = open_settings(&args, &config)?;
            show_info(&file, format)?;
        }
        Command::List { file, kind } => {
            let file = open_settings(&file, &config)?;
            let records = match kind {
                Some(kind) => file.get_all_kind(kind)?,
                None => file.get_all_types()?,
            };
            match format {
                OutputFormat::Json => output::print_json(&records)?,
                OutputFormat::Text => output::print_records(&records),
            }
        }
        Command::Get(var) => {
            let file = open_settings(&var.file, &config)?;
            let text = if var.kind.is_metadata() {
                file.get_metadata(&var.name)?
            } else {
                crate::dispatch_kind!(var.kind,
                    T => file.try_get::<T>(&var.name)?.map(|v| v.to_text()),
                    meta => None)
            };
            let Some(text) = text else {
                bail!("{}/{} not found in {}", var.kind, var.name, file.name());
            };
            match format {
                OutputFormat::Json => output::print_json(&json!({
                    "kind": var.kind,
                    "name": var.name,
                    "value": text,
                }))?,
                OutputFormat::Text => println!("{text}"),
            }
        }
        Command::Add {
            var,
            value,
            description,
            group,
        } => {
            reject_metadata(var.kind)?;
            let mut file = open_settings(&var.file, &config)?;
            let added = crate::dispatch_kind!(var.kind,
                T => file.add(&var.name, parse_value::<T>(&value)?, &description, &group)?,
                meta => false);
            if !added {
                bail!("{}/{} already exists", var.kind, var.name);
            }
            file.close()?;
            report_change(format, &var, "added")?;
        }
        Command::Set {
            var,
            value,
            default,
        } => {
            reject_metadata(var.kind)?;
            let mut file = open_settings(&var.file, &config)?;
            let changed = crate::dispatch_kind!(var.kind,
                T => {
                    let parsed = parse_value::<T>(&value)?;
                    if default {
                        file.set_default(&var.name, parsed)?
                    } else {
                        file.set(&var.name, parsed)?
                    }
                },
                meta => false);
            if !changed {
                bail!("{}/{} not found", var.kind, var.name);
            }
            file.close()?;
            report_change(format, &var, "set")?;
        }
        Command::Edit {
            var,
            description,
            group,
        } => {
            reject_metadata(var.kind)?;
            let mut file = open_settings(&var.file, &config)?;
            let changed = crate::dispatch_kind!(var.kind,
                T => file.edit::<T>(&var.name, &description, &group)?,
                meta => false);
            if !changed {
                bail!("{}/{} not found", var.kind, var.name);
            }
            file.close()?;
            report_change(format, &var, "edited")?;
        }
        Command::Delete(var) => {
            reject_metadata(var.kind)?;
            let mut file = open_settings(&var.file, &config)?;
            let deleted = crate::dispatch_kind!(var.kind,
                T => file.delete::<T>(&var.name)?,
                meta => false);
            if !deleted {
                bail!("{}/{} not found", var.kind, var.name);
            }
            file.close()?;
            report_change(format, &var, "deleted")?;
        }
        Command::Migrate {
            source,
            destination,
            to,
        } => {
            let source_file = SettingsFile::new(&source, StoreMode::Auto)
                .with_context(|| format!("cannot read {}", source.display()))?;
            let destination_file = SettingsFile::new(&destination, to.into())?;
            let report = CrossModeMigration::new(source_file, destination_file)?.migrate()?;
            match format {
                OutputFormat::Json => output::print_json(&report)?,
                OutputFormat::Text => println!(
                    "{} {} of {} records into {} ({to})",
                    "migrated".green().bold(),
                    report.records_imported,
                    report.records_read,
                    destination.display()
                ),
            }
        }
        Command::ImportLegacy {
            xml,
            destination,
            to,
        } => {
            let destination_file = SettingsFile::new(&destination, to.into())?;
            let report = LegacyXmlImport::new(&xml, destination_file)?.migrate()?;
            match format {
                OutputFormat::Json => output::print_json(&report)?,
                OutputFormat::Text => println!(
                    "{} {} of {} records from {} into {} ({to})",
                    "imported".green().bold(),
                    report.records_imported,
                    report.records_read,
                    xml.display(),
                    destination.display()
                ),
            }
        }
    }
    Ok(())
}

fn store_mode(args: &FileArgs) -> StoreMode {
    match args.mode {
        ModeArg::Sqlite => StoreMode::Sqlite,
        ModeArg::Xml => StoreMode::Xml,
        ModeArg::Auto if args.file.exists() => StoreMode::Auto,
        ModeArg::Auto => mode_for_new_file(&args.file),
    }
}

/// `.xml` files are created as XML, everything else as SQLite.
fn mode_for_new_file(path: &Path) -> StoreMode {
    let is_xml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    if is_xml { StoreMode::Xml } else { StoreMode::Sqlite }
}

fn open_settings(args: &FileArgs, config: &SsmConfig) -> anyhow::Result<SettingsFile> {
    let mut file = SettingsFile::new(&args.file, store_mode(args))?;
    file.set_auto_save(config.auto_save);
    file.open()
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    Ok(file)
}

fn parse_value<T: SettingValue>(raw: &str) -> anyhow::Result<T> {
    T::from_text(raw).with_context(|| format!("'{raw}' is not a valid {}", T::KIND))
}

fn reject_metadata(kind: ValueKind) -> anyhow::Result<()> {
    if kind.is_metadata() {
        bail!("metadata keys are maintained by the store and cannot be changed directly");
    }
    Ok(())
}

fn report_change(format: OutputFormat, var: &VarArgs, action: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => output::print_json(&json!({
            "kind": var.kind,
            "name": var.name,
            "status": action,
        })),
        OutputFormat::Text => {
            println!("{} {}/{}", action.green().bold(), var.kind, var.name);
            Ok(())
        }
    }
}

fn show_info(file: &SettingsFile, format: OutputFormat) -> anyhow::Result<()> {
    let modified = file
        .last_modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let variables = file
        .get_all_types()?
        .into_iter()
        .filter(|r| !r.kind().is_metadata())
        .count();
    let metadata = file.get_all_metadata()?;

    match format {
        OutputFormat::Json => output::print_json(&json!({
            "path": file.path(),
            "name": file.name(),
            "mode": file.mode(),
            "last_modified": modified,
            "variables": variables,
            "metadata": metadata,
        })),
        OutputFormat::Text => {
            output::print_fields(&[
                ("path", file.path().display().to_string()),
                ("mode", file.mode().to_string()),
                ("last modified", modified.to_string()),
                ("variables", variables.to_string()),
            ]);
            println!();
            output::print_records(&metadata);
            Ok(())
        }
    }
}
