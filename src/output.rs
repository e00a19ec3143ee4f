//! Full-data export of aggregates.
//!
//! Charts show only the top groups; these CSV files carry every group.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::types::{MarketShareRow, YearlyAggregate};

/// A row type that can be exported. `HEADER` must match the serialized field order.
pub trait ExportRow: Serialize {
    const HEADER: &'static [&'static str];
}

impl ExportRow for YearlyAggregate {
    const HEADER: &'static [&'static str] = &["year", "key", "value", "cumulative"];
}

impl ExportRow for MarketShareRow {
    const HEADER: &'static [&'static str] = &["year", "key", "value", "year_total", "share_pct"];
}

/// Writes `records` to a CSV file at `path`, replacing any existing file.
///
/// The header row is written even when `records` is empty.
pub fn write_records<T: ExportRow>(path: &Path, records: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = records.len(), "Writing CSV export");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .delimiter(b';')
        .from_writer(file);

    if records.is_empty() {
        writer.write_record(T::HEADER)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = records.len(), "CSV export written");
    Ok(())
}
