//! Aggregation and selection over normalized records.
//!
//! [`aggregate`] groups rows into yearly or per-key metrics and derives
//! cumulative totals and market shares; [`select`] ranks the groups and
//! keeps the top N for charting.

pub mod aggregate;
pub mod select;
pub mod types;
pub mod utility;
