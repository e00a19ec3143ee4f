//! The load → normalize → aggregate → select pipeline shared by the batch
//! report and the dashboard.

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::analyzers::aggregate::{
    Metric, accumulate_by_key, aggregate_by_key, aggregate_by_year, distinct_years, market_share,
};
use crate::analyzers::select::{mean_share_by_key, rank_descending, retain_keys, top_n};
use crate::analyzers::types::{MarketShareRow, SaleRecord, StationRecord, YearlyAggregate};
use crate::cache::FetchCache;
use crate::charts::{BarChart, LineChart};
use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::fetch::{HttpClient, decode_text};
use crate::normalize::{NormalizeReport, Normalized, normalize_sales, normalize_stations};
use crate::parser::{RawTable, parse_table};

pub const SALES_DATASET: &str = "vendas";
pub const STATIONS_DATASET: &str = "postos";

/// Fetches (through `cache`), decodes and parses one resource.
pub async fn load_table<C: HttpClient>(
    client: &C,
    cache: &FetchCache,
    config: &Config,
    source: &str,
    dataset: &str,
) -> Result<RawTable> {
    let body = cache.get_or_fetch(client, source).await?;
    let text = decode_text(&body, config.encoding, source)?;
    Ok(parse_table(&text, config.delimiter, dataset)?)
}

pub async fn load_sales<C: HttpClient>(
    client: &C,
    cache: &FetchCache,
    config: &Config,
) -> Result<Normalized<SaleRecord>> {
    let table = load_table(client, cache, config, &config.sales_source, SALES_DATASET).await?;
    let normalized = normalize_sales(&table)?;
    check_drop_rate(&normalized.report, config.max_drop_rate);
    Ok(normalized)
}

pub async fn load_stations<C: HttpClient>(
    client: &C,
    cache: &FetchCache,
    config: &Config,
) -> Result<Normalized<StationRecord>> {
    let table = load_table(client, cache, config, &config.stations_source, STATIONS_DATASET).await?;
    let normalized = normalize_stations(&table)?;
    check_drop_rate(&normalized.report, config.max_drop_rate);
    Ok(normalized)
}

/// Flags a dataset whose share of unusable lines exceeds `max_rate`.
///
/// Returns `true` when the threshold was exceeded. Rows are dropped either way.
pub fn check_drop_rate(report: &NormalizeReport, max_rate: f64) -> bool {
    let rate = report.drop_rate();
    if rate > max_rate {
        warn!(
            dataset = %report.dataset,
            drop_rate = rate,
            max_drop_rate = max_rate,
            dropped = report.dropped_total(),
            skipped_lines = report.skipped_lines,
            "Drop rate above threshold"
        );
        true
    } else {
        false
    }
}

/// Yearly market share of each regulated agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareTrend {
    /// Every (year, agent) row, for export.
    pub full: Vec<MarketShareRow>,
    /// Agents with the highest mean share, largest first.
    pub selected_keys: Vec<String>,
    pub plotted: Vec<MarketShareRow>,
}

impl ShareTrend {
    pub fn series(&self) -> Vec<(String, Vec<(i32, f64)>)> {
        series_for(&self.selected_keys, &self.plotted, |r| {
            (r.key.as_str(), r.year, r.share_pct)
        })
    }

    pub fn chart(&self) -> LineChart {
        LineChart {
            title: "Evolução do Market Share (Volume de Vendas) dos Maiores Agentes".to_string(),
            x_desc: "Ano".to_string(),
            y_desc: "Participação de Mercado (%)".to_string(),
            series: self.series(),
        }
    }
}

/// Computes market share per (year, agent) and keeps the `top_n` agents by
/// mean share.
///
/// # Errors
///
/// [`AnalysisError::InsufficientYears`] when the sales cover fewer than two
/// distinct years; [`AnalysisError::ZeroTotal`] when a year sold nothing.
pub fn market_share_trend(
    sales: &[SaleRecord],
    top_n_agents: usize,
) -> std::result::Result<ShareTrend, AnalysisError> {
    let years = distinct_years(sales, |s| s.year);
    if years.len() < 2 {
        return Err(AnalysisError::InsufficientYears {
            distinct: years.len(),
        });
    }
    info!(years = years.len(), "Sales data sufficient for temporal analysis");

    let by_agent = aggregate_by_year(
        sales,
        |s| s.year,
        |s| s.agent.as_str(),
        |s| s.volume,
        Metric::Sum,
    );
    let full = market_share(&by_agent)?;
    let selected_keys = top_n(&mean_share_by_key(&full), top_n_agents);
    let plotted = retain_keys(&full, &selected_keys, |r| r.key.as_str());

    Ok(ShareTrend {
        full,
        selected_keys,
        plotted,
    })
}

/// New and cumulative station counts per (affiliation year, brand).
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthTrend {
    pub full: Vec<YearlyAggregate>,
    /// Brands with the most stations in the recent subset, largest first.
    pub selected_keys: Vec<String>,
    pub plotted: Vec<YearlyAggregate>,
}

impl GrowthTrend {
    pub fn series(&self) -> Vec<(String, Vec<(i32, f64)>)> {
        series_for(&self.selected_keys, &self.plotted, |r| {
            (r.key.as_str(), r.year, r.cumulative.unwrap_or(r.value))
        })
    }

    pub fn chart(&self, min_year: i32) -> LineChart {
        LineChart {
            title: format!(
                "Crescimento Acumulado do Número de Postos das Maiores Bandeiras (a partir de {min_year})"
            ),
            x_desc: "Ano".to_string(),
            y_desc: "Número Total de Postos (Acumulado)".to_string(),
            series: self.series(),
        }
    }
}

/// Counts stations affiliated from `min_year` onwards by (year, brand),
/// accumulates per brand, and keeps the `top_n_brands` largest brands.
pub fn station_growth(
    stations: &[StationRecord],
    min_year: i32,
    top_n_brands: usize,
) -> GrowthTrend {
    let recent: Vec<&StationRecord> = stations
        .iter()
        .filter(|s| s.affiliation_year() >= min_year)
        .collect();

    let mut full = aggregate_by_year(
        &recent,
        |s| s.affiliation_year(),
        |s| s.brand.as_str(),
        |_| 1.0,
        Metric::Count,
    );
    accumulate_by_key(&mut full);

    let counts = aggregate_by_key(&recent, |s| s.brand.as_str(), |_| 1.0, Metric::Count);
    let selected_keys = top_n(&counts, top_n_brands);
    let plotted = retain_keys(&full, &selected_keys, |r| r.key.as_str());

    GrowthTrend {
        full,
        selected_keys,
        plotted,
    }
}

/// Groups ranked by a single-period metric.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ranking {
    /// Every group, largest first.
    pub full: Vec<(String, f64)>,
    pub top: Vec<(String, f64)>,
}

impl Ranking {
    fn from_groups(groups: &[(String, f64)], n: usize) -> Self {
        let full = rank_descending(groups);
        let top = full.iter().take(n).cloned().collect();
        Self { full, top }
    }

    pub fn total(&self) -> f64 {
        self.full.iter().map(|(_, v)| v).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    pub fn bar_chart(&self, title: &str, x_desc: &str, y_desc: &str) -> BarChart {
        BarChart {
            title: title.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: y_desc.to_string(),
            bars: self.top.clone(),
        }
    }
}

/// Stations per brand.
pub fn brand_ranking(stations: &[StationRecord], n: usize) -> Ranking {
    let counts = aggregate_by_key(stations, |s| s.brand.as_str(), |_| 1.0, Metric::Count);
    Ranking::from_groups(&counts, n)
}

/// Sales volume per regulated agent.
pub fn agent_volume_ranking(sales: &[SaleRecord], n: usize) -> Ranking {
    let volumes = aggregate_by_key(sales, |s| s.agent.as_str(), |s| s.volume, Metric::Sum);
    Ranking::from_groups(&volumes, n)
}

/// Sorted distinct municipalities.
pub fn municipalities(stations: &[StationRecord]) -> Vec<String> {
    stations
        .iter()
        .map(|s| s.municipality.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Stations in `municipality`, or all of them when `None`.
pub fn filter_municipality(
    stations: &[StationRecord],
    municipality: Option<&str>,
) -> Vec<StationRecord> {
    match municipality {
        Some(m) => stations
            .iter()
            .filter(|s| s.municipality == m)
            .cloned()
            .collect(),
        None => stations.to_vec(),
    }
}

fn series_for<T>(
    keys: &[String],
    rows: &[T],
    point: impl Fn(&T) -> (&str, i32, f64),
) -> Vec<(String, Vec<(i32, f64)>)> {
    keys.iter()
        .map(|key| {
            let points = rows
                .iter()
                .map(&point)
                .filter(|(k, _, _)| *k == key.as_str())
                .map(|(_, year, y)| (year, y))
                .collect();
            (key.clone(), points)
        })
        .collect()
}
