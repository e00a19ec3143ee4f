//! Top-N selection of aggregated groups.

use std::collections::{BTreeMap, HashSet};

use crate::analyzers::types::MarketShareRow;
use crate::analyzers::utility::mean;

/// Top groups kept in market share and growth trend views.
pub const DEFAULT_TREND_TOP_N: usize = 4;
/// Top groups kept in single-period rankings.
pub const DEFAULT_RANKING_TOP_N: usize = 15;

/// Sorts groups by metric descending; equal metrics keep their input order.
pub fn rank_descending(metrics: &[(String, f64)]) -> Vec<(String, f64)> {
    let mut ranked = metrics.to_vec();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Returns the `n` keys with the largest metric, largest first.
pub fn top_n(metrics: &[(String, f64)], n: usize) -> Vec<String> {
    rank_descending(metrics)
        .into_iter()
        .take(n)
        .map(|(key, _)| key)
        .collect()
}

/// Mean share per key across the years it appears in, ordered by key.
pub fn mean_share_by_key(rows: &[MarketShareRow]) -> Vec<(String, f64)> {
    let mut shares: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows {
        shares.entry(row.key.as_str()).or_default().push(row.share_pct);
    }
    shares
        .into_iter()
        .map(|(key, values)| (key.to_string(), mean(&values)))
        .collect()
}

/// Keeps only the rows whose key is in `keys`.
pub fn retain_keys<T: Clone>(rows: &[T], keys: &[String], key: impl Fn(&T) -> &str) -> Vec<T> {
    let selected: HashSet<&str> = keys.iter().map(String::as_str).collect();
    rows.iter()
        .filter(|row| selected.contains(key(row)))
        .cloned()
        .collect()
}
