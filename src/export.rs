// 📤 Export - registry snapshot as CSV or JSON

use crate::db::format_timestamp;
use crate::registration::FalconRegistration;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => bail!("unknown export format: {}", other),
        }
    }
}

/// One CSV line. Missing optional fields become empty cells.
#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    name: &'a str,
    breed: &'a str,
    weight: &'a str,
    notes: &'a str,
    #[serde(rename = "createdAt")]
    created_at: String,
}

impl<'a> From<&'a FalconRegistration> for CsvRow<'a> {
    fn from(r: &'a FalconRegistration) -> Self {
        CsvRow {
            id: &r.id,
            name: &r.name,
            breed: r.breed.as_deref().unwrap_or_default(),
            weight: r.weight.as_deref().unwrap_or_default(),
            notes: r.notes.as_deref().unwrap_or_default(),
            created_at: format_timestamp(&r.created_at),
        }
    }
}

pub fn write_csv<W: Write>(records: &[FalconRegistration], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    if records.is_empty() {
        wtr.write_record(["id", "name", "breed", "weight", "notes", "createdAt"])?;
    }
    for record in records {
        wtr.serialize(CsvRow::from(record))
            .with_context(|| format!("Failed to write registration {}", record.id))?;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn write_json<W: Write>(records: &[FalconRegistration], writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, records).context("Failed to write JSON export")?;
    Ok(())
}

pub fn export<W: Write>(records: &[FalconRegistration], format: ExportFormat, writer: W) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(records, writer),
        ExportFormat::Json => write_json(records, writer),
    }
}

pub fn export_to_string(records: &[FalconRegistration], format: ExportFormat) -> Result<String> {
    let mut buf = Vec::new();
    export(records, format, &mut buf)?;
    String::from_utf8(buf).context("Export produced invalid UTF-8")
}
