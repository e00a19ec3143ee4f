//! Group-by aggregation, cumulative totals and market share.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::analyzers::types::{MarketShareRow, YearlyAggregate};
use crate::analyzers::utility::pct;
use crate::error::AnalysisError;

/// How rows inside one group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Number of rows in the group; the value function is ignored.
    Count,
    Sum,
}

impl Metric {
    fn apply(self, acc: &mut f64, value: f64) {
        match self {
            Metric::Count => *acc += 1.0,
            Metric::Sum => *acc += value,
        }
    }
}

/// Groups rows by (year, key) and combines each group with `metric`.
///
/// The result is ordered by year ascending, then key ascending.
pub fn aggregate_by_year<T>(
    rows: &[T],
    year: impl Fn(&T) -> i32,
    key: impl Fn(&T) -> &str,
    value: impl Fn(&T) -> f64,
    metric: Metric,
) -> Vec<YearlyAggregate> {
    let mut groups: BTreeMap<(i32, &str), f64> = BTreeMap::new();
    for row in rows {
        let acc = groups.entry((year(row), key(row))).or_insert(0.0);
        metric.apply(acc, value(row));
    }

    groups
        .into_iter()
        .map(|((year, key), value)| YearlyAggregate {
            year,
            key: key.to_string(),
            value,
            cumulative: None,
        })
        .collect()
}

/// Groups rows by a single key, ordered by key ascending.
pub fn aggregate_by_key<T>(
    rows: &[T],
    key: impl Fn(&T) -> &str,
    value: impl Fn(&T) -> f64,
    metric: Metric,
) -> Vec<(String, f64)> {
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        let acc = groups.entry(key(row)).or_insert(0.0);
        metric.apply(acc, value(row));
    }
    groups
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Fills `cumulative` with the running total of `value` per key.
///
/// Aggregates must already be ordered by year ascending, which is what
/// [`aggregate_by_year`] produces.
pub fn accumulate_by_key(aggregates: &mut [YearlyAggregate]) {
    let mut running: HashMap<String, f64> = HashMap::new();
    for agg in aggregates.iter_mut() {
        let total = running.entry(agg.key.clone()).or_insert(0.0);
        *total += agg.value;
        agg.cumulative = Some(*total);
    }
}

/// Joins each aggregate with its year's total and computes its share in percent.
///
/// # Errors
///
/// Returns [`AnalysisError::ZeroTotal`] for a year whose total is zero.
pub fn market_share(aggregates: &[YearlyAggregate]) -> Result<Vec<MarketShareRow>, AnalysisError> {
    let mut totals: BTreeMap<i32, f64> = BTreeMap::new();
    for agg in aggregates {
        *totals.entry(agg.year).or_insert(0.0) += agg.value;
    }

    aggregates
        .iter()
        .map(|agg| {
            let year_total = totals[&agg.year];
            let share_pct =
                pct(agg.value, year_total).ok_or(AnalysisError::ZeroTotal { year: agg.year })?;
            Ok(MarketShareRow {
                year: agg.year,
                key: agg.key.clone(),
                value: agg.value,
                year_total,
                share_pct,
            })
        })
        .collect()
}

/// Distinct years, ascending.
pub fn distinct_years<T>(rows: &[T], year: impl Fn(&T) -> i32) -> Vec<i32> {
    rows.iter()
        .map(year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        year: i32,
        key: &'static str,
        value: f64,
    }

    fn row(year: i32, key: &'static str, value: f64) -> Row {
        Row { year, key, value }
    }

    fn yearly(rows: &[Row], metric: Metric) -> Vec<YearlyAggregate> {
        aggregate_by_year(rows, |r| r.year, |r| r.key, |r| r.value, metric)
    }

    #[test]
    fn test_sum_by_year_and_key() {
        let rows = vec![
            row(2021, "B", 2.0),
            row(2020, "A", 1.5),
            row(2020, "A", 0.5),
            row(2020, "B", 3.0),
        ];
        let aggs = yearly(&rows, Metric::Sum);

        let keys: Vec<_> = aggs.iter().map(|a| (a.year, a.key.as_str(), a.value)).collect();
        assert_eq!(
            keys,
            vec![(2020, "A", 2.0), (2020, "B", 3.0), (2021, "B", 2.0)]
        );
        assert!(aggs.iter().all(|a| a.cumulative.is_none()));
    }

    #[test]
    fn test_count_ignores_value() {
        let rows = vec![row(2020, "X", 100.0), row(2020, "X", -3.0), row(2021, "X", 0.0)];
        let aggs = yearly(&rows, Metric::Count);
        assert_eq!(aggs[0].value, 2.0);
        assert_eq!(aggs[1].value, 1.0);
    }

    #[test]
    fn test_aggregate_by_key_sorted() {
        let rows = vec![row(2020, "B", 1.0), row(2021, "A", 2.0), row(2022, "B", 4.0)];
        let groups = aggregate_by_key(&rows, |r| r.key, |r| r.value, Metric::Sum);
        assert_eq!(groups, vec![("A".to_string(), 2.0), ("B".to_string(), 5.0)]);
    }

    #[test]
    fn test_cumulative_per_brand() {
        let mut rows = Vec::new();
        for (year, n) in [(2000, 5), (2001, 3), (2002, 7)] {
            for _ in 0..n {
                rows.push(row(year, "X", 0.0));
            }
        }
        rows.push(row(2001, "Y", 0.0));

        let mut aggs = yearly(&rows, Metric::Count);
        accumulate_by_key(&mut aggs);

        let x: Vec<_> = aggs
            .iter()
            .filter(|a| a.key == "X")
            .map(|a| a.cumulative.unwrap())
            .collect();
        assert_eq!(x, vec![5.0, 8.0, 15.0]);

        let y: Vec<_> = aggs.iter().filter(|a| a.key == "Y").collect();
        assert_eq!(y[0].cumulative, Some(1.0));
    }

    #[test]
    fn test_cumulative_is_non_decreasing() {
        let rows: Vec<_> = (0..40)
            .map(|i| row(2000 + (i % 7), ["A", "B", "C"][(i % 3) as usize], 0.0))
            .collect();
        let mut aggs = yearly(&rows, Metric::Count);
        accumulate_by_key(&mut aggs);

        for key in ["A", "B", "C"] {
            let series: Vec<_> = aggs
                .iter()
                .filter(|a| a.key == key)
                .map(|a| (a.year, a.cumulative.unwrap()))
                .collect();
            assert!(series.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 <= w[1].1));
        }
    }

    #[test]
    fn test_market_share_sums_to_100_per_year() {
        let rows = vec![
            row(2020, "A", 1.0),
            row(2020, "B", 2.0),
            row(2020, "C", 4.0),
            row(2021, "A", 0.3),
            row(2021, "C", 0.7),
        ];
        let shares = market_share(&yearly(&rows, Metric::Sum)).unwrap();

        for year in [2020, 2021] {
            let sum: f64 = shares
                .iter()
                .filter(|s| s.year == year)
                .map(|s| s.share_pct)
                .sum();
            assert!((sum - 100.0).abs() < 0.01, "year {year} sums to {sum}");
        }

        let a2020 = shares.iter().find(|s| s.year == 2020 && s.key == "A").unwrap();
        assert_eq!(a2020.year_total, 7.0);
    }

    #[test]
    fn test_market_share_zero_total_fails() {
        let rows = vec![row(2020, "A", 1.0), row(2021, "A", 0.0), row(2021, "B", 0.0)];
        let err = market_share(&yearly(&rows, Metric::Sum)).unwrap_err();
        assert_eq!(err, AnalysisError::ZeroTotal { year: 2021 });
    }

    #[test]
    fn test_distinct_years() {
        let rows = vec![row(2022, "A", 0.0), row(2020, "A", 0.0), row(2022, "B", 0.0)];
        assert_eq!(distinct_years(&rows, |r| r.year), vec![2020, 2022]);
    }
}
