//! Terminal rendering for the `ssm` command line.

use crate::core::record::TypedRecord;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

const MAX_VALUE_CHARS: usize = 60;
const MAX_DESC_CHARS: usize = 80;

/// One line per record: `[Kind] group/name = value (default d)  description`.
pub fn record_line(record: &TypedRecord) -> String {
    let value = compact_line(&record.display_value(), MAX_VALUE_CHARS);
    let mut line = format!(
        "{} {}/{} = {}",
        format!("[{}]", record.kind()).dimmed(),
        record.group().cyan(),
        record.name().bold(),
        value.green()
    );
    if !record.kind().is_metadata() {
        let default = record.display_default();
        if default != record.display_value() {
            line.push_str(&format!(
                " {}",
                format!("(default {})", compact_line(&default, MAX_VALUE_CHARS)).yellow()
            ));
        }
    }
    if !record.description().is_empty() {
        line.push_str(&format!(
            "  {}",
            compact_line(record.description(), MAX_DESC_CHARS).italic()
        ));
    }
    line
}

pub fn print_records(records: &[TypedRecord]) {
    if records.is_empty() {
        println!("{}", "(no variables)".dimmed());
        return;
    }
    for record in records {
        println!("{}", record_line(record));
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `label: value` pairs, labels padded to a common width.
pub fn print_fields(fields: &[(&str, String)]) {
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in fields {
        println!("{}  {}", format!("{key:width$}").bold(), value);
    }
}
