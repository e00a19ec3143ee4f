//! Data types used by the aggregation pipeline.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// One retail fuel station registration.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub state: String,
    pub municipality: String,
    pub brand: String,
    pub affiliation_date: NaiveDate,
}

impl StationRecord {
    pub fn affiliation_year(&self) -> i32 {
        self.affiliation_date.year()
    }
}

/// One wholesale sales line. `volume` is in thousands of m³ and never negative.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub year: i32,
    pub destination_state: String,
    pub agent: String,
    pub volume: f64,
}

/// Metric of one (year, group key) combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyAggregate {
    pub year: i32,
    pub key: String,
    pub value: f64,
    /// Running total of `value` for `key` up to and including `year`.
    pub cumulative: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketShareRow {
    pub year: i32,
    pub key: String,
    pub value: f64,
    pub year_total: f64,
    pub share_pct: f64,
}
