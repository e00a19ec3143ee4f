//! Column rules that turn raw text rows into typed records.
//!
//! A row is either fully normalized or dropped. Drops are not errors: they
//! are logged at debug level with their reason and counted in the
//! [`NormalizeReport`].

use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::analyzers::types::{SaleRecord, StationRecord};
use crate::error::ParseError;
use crate::parser::RawTable;

pub const COL_STATE: &str = "UF";
pub const COL_MUNICIPALITY: &str = "MUNICIPIO";
pub const COL_BRAND: &str = "BANDEIRA";
pub const COL_AFFILIATION_DATE: &str = "DATAVINCULACAO";

pub const COL_YEAR: &str = "Ano";
pub const COL_AGENT: &str = "Agente Regulado";
pub const COL_DESTINATION_STATE: &str = "UF Destino";
pub const COL_VOLUME: &str = "Quantidade de Produto (mil m³)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DropReason {
    InvalidYear,
    InvalidVolume,
    NegativeVolume,
    InvalidDate,
    EmptyField,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::InvalidYear => "invalid_year",
            DropReason::InvalidVolume => "invalid_volume",
            DropReason::NegativeVolume => "negative_volume",
            DropReason::InvalidDate => "invalid_date",
            DropReason::EmptyField => "empty_field",
        };
        f.write_str(s)
    }
}

/// Row accounting for one normalized dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub dataset: String,
    /// Rows handed to the normalizer.
    pub total: usize,
    pub kept: usize,
    /// Lines the parser rejected before normalization.
    pub skipped_lines: usize,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl NormalizeReport {
    fn new(table: &RawTable) -> Self {
        Self {
            dataset: table.dataset.clone(),
            skipped_lines: table.skipped,
            ..Default::default()
        }
    }

    fn drop_row(&mut self, line: usize, reason: DropReason) {
        debug!(dataset = %self.dataset, line, %reason, "Dropping row");
        *self.dropped.entry(reason).or_insert(0) += 1;
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }

    /// Share of read lines that did not become records, from 0.0 to 1.0.
    pub fn drop_rate(&self) -> f64 {
        let read = self.total + self.skipped_lines;
        if read == 0 {
            0.0
        } else {
            (self.dropped_total() + self.skipped_lines) as f64 / read as f64
        }
    }
}

/// Records produced by a normalizer together with their row accounting.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub report: NormalizeReport,
}

/// Parses a number written with a comma decimal separator.
pub fn parse_decimal_comma(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parses a `dd/mm/yyyy` date.
pub fn parse_dmy_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

/// Coerces a year column; accepts integral decimals such as `"2021.0"`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    let value: f64 = raw.parse().ok()?;
    let in_range = value.is_finite() && value.fract() == 0.0 && value.abs() <= i32::MAX as f64;
    in_range.then_some(value as i32)
}

fn text_field(record: &StringRecord, index: usize) -> Option<String> {
    let value = record.get(index)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn normalize_sale(record: &StringRecord, cols: [usize; 4]) -> Result<SaleRecord, DropReason> {
    let [year, agent, state, volume] = cols;

    let year = record
        .get(year)
        .and_then(parse_year)
        .ok_or(DropReason::InvalidYear)?;
    let volume = record
        .get(volume)
        .and_then(parse_decimal_comma)
        .ok_or(DropReason::InvalidVolume)?;
    if volume < 0.0 {
        return Err(DropReason::NegativeVolume);
    }
    let agent = text_field(record, agent).ok_or(DropReason::EmptyField)?;
    let destination_state = text_field(record, state).ok_or(DropReason::EmptyField)?;

    Ok(SaleRecord {
        year,
        destination_state,
        agent,
        volume,
    })
}

fn normalize_station(record: &StringRecord, cols: [usize; 4]) -> Result<StationRecord, DropReason> {
    let [state, municipality, brand, date] = cols;

    let affiliation_date = record
        .get(date)
        .and_then(parse_dmy_date)
        .ok_or(DropReason::InvalidDate)?;

    Ok(StationRecord {
        state: text_field(record, state).ok_or(DropReason::EmptyField)?,
        municipality: text_field(record, municipality).ok_or(DropReason::EmptyField)?,
        brand: text_field(record, brand).ok_or(DropReason::EmptyField)?,
        affiliation_date,
    })
}

fn normalize_rows<T>(
    table: &RawTable,
    cols: [usize; 4],
    row_fn: impl Fn(&StringRecord, [usize; 4]) -> Result<T, DropReason>,
) -> Normalized<T> {
    let mut report = NormalizeReport::new(table);
    let mut records = Vec::with_capacity(table.rows.len());

    for (i, record) in table.rows.iter().enumerate() {
        report.total += 1;
        match row_fn(record, cols) {
            Ok(r) => records.push(r),
            // header is line 1
            Err(reason) => report.drop_row(i + 2, reason),
        }
    }
    report.kept = records.len();

    info!(
        dataset = %report.dataset,
        total = report.total,
        kept = report.kept,
        dropped = report.dropped_total(),
        skipped_lines = report.skipped_lines,
        "Dataset normalized"
    );

    Normalized { records, report }
}

/// Normalizes the wholesale sales ledger.
///
/// # Errors
///
/// Returns [`ParseError::MissingColumn`] if a required column is absent and
/// [`ParseError::NoUsableRows`] if every row was dropped.
pub fn normalize_sales(table: &RawTable) -> Result<Normalized<SaleRecord>, ParseError> {
    let cols = table.require([COL_YEAR, COL_AGENT, COL_DESTINATION_STATE, COL_VOLUME])?;
    ensure_usable(normalize_rows(table, cols, normalize_sale))
}

/// Normalizes the retail station registry.
///
/// # Errors
///
/// Returns [`ParseError::MissingColumn`] if a required column is absent and
/// [`ParseError::NoUsableRows`] if every row was dropped.
pub fn normalize_stations(table: &RawTable) -> Result<Normalized<StationRecord>, ParseError> {
    let cols = table.require([COL_STATE, COL_MUNICIPALITY, COL_BRAND, COL_AFFILIATION_DATE])?;
    ensure_usable(normalize_rows(table, cols, normalize_station))
}

/// A dataset with rows but no surviving records failed as a whole.
fn ensure_usable<T>(normalized: Normalized<T>) -> Result<Normalized<T>, ParseError> {
    let report = &normalized.report;
    if report.total > 0 && report.kept == 0 {
        return Err(ParseError::NoUsableRows {
            dataset: report.dataset.clone(),
            dropped: report.dropped_total(),
        });
    }
    Ok(normalized)
}

/// Keeps stations registered in state `uf`.
pub fn filter_station_state(records: Vec<StationRecord>, uf: &str) -> Vec<StationRecord> {
    records.into_iter().filter(|r| r.state == uf).collect()
}

/// Keeps sales whose destination is state `uf`.
pub fn filter_sale_state(records: Vec<SaleRecord>, uf: &str) -> Vec<SaleRecord> {
    records
        .into_iter()
        .filter(|r| r.destination_state == uf)
        .collect()
}
