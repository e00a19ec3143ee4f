//! Batch mode: one market share chart and one station growth chart.
//!
//! The two analyses are independent. A failure in one is returned in its
//! own slot of [`ReportSummary`] and never stops the other.

use anyhow::Result;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::cache::FetchCache;
use crate::charts::{Chart, Rendered, render_png};
use crate::config::Config;
use crate::error::AnalysisError;
use crate::fetch::HttpClient;
use crate::output::write_records;
use crate::pipeline::{load_sales, load_stations, market_share_trend, station_growth};

pub const MARKET_SHARE_CHART: &str = "market_share_vendas_por_ano.png";
pub const STATION_GROWTH_CHART: &str = "crescimento_postos_por_ano.png";
pub const MARKET_SHARE_EXPORT: &str = "market_share_vendas_por_ano.csv";
pub const STATION_GROWTH_EXPORT: &str = "crescimento_postos_por_ano.csv";

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub output_dir: PathBuf,
    /// Also write the full aggregates behind each chart as CSV.
    pub export: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            export: false,
        }
    }
}

#[derive(Debug)]
pub struct ReportSummary {
    pub market_share: Result<Rendered<PathBuf>>,
    pub station_growth: Result<Rendered<PathBuf>>,
}

impl ReportSummary {
    /// Number of analyses that failed.
    pub fn failures(&self) -> usize {
        [&self.market_share, &self.station_growth]
            .iter()
            .filter(|r| r.is_err())
            .count()
    }
}

/// Runs both analyses and logs the outcome of each.
pub async fn run_report<C: HttpClient>(
    client: &C,
    cache: &FetchCache,
    config: &Config,
    options: &ReportOptions,
) -> ReportSummary {
    let market_share = market_share_report(client, cache, config, options).await;
    log_outcome("market_share", &market_share);

    let station_growth = station_growth_report(client, cache, config, options).await;
    log_outcome("station_growth", &station_growth);

    ReportSummary {
        market_share,
        station_growth,
    }
}

/// Market share of the largest agents by year, from the sales ledger.
///
/// A ledger with a single year yields a warning, not a chart.
#[tracing::instrument(skip_all, fields(analysis = "market_share"))]
pub async fn market_share_report<C: HttpClient>(
    client: &C,
    cache: &FetchCache,
    config: &Config,
    options: &ReportOptions,
) -> Result<Rendered<PathBuf>> {
    let sales = load_sales(client, cache, config).await?;

    let trend = match market_share_trend(&sales.records, config.trend_top_n) {
        Ok(trend) => trend,
        Err(e @ AnalysisError::InsufficientYears { .. }) => {
            warn!(error = %e, "Sales data does not support a temporal analysis");
            return Ok(Rendered::Warning(e.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    if options.export {
        write_records(&options.output_dir.join(MARKET_SHARE_EXPORT), &trend.full)?;
    }

    let chart = Chart::Line(trend.chart());
    Ok(render_png(&chart, &options.output_dir.join(MARKET_SHARE_CHART))?)
}

/// Cumulative station count of the largest brands, from the station registry.
#[tracing::instrument(skip_all, fields(analysis = "station_growth"))]
pub async fn station_growth_report<C: HttpClient>(
    client: &C,
    cache: &FetchCache,
    config: &Config,
    options: &ReportOptions,
) -> Result<Rendered<PathBuf>> {
    let stations = load_stations(client, cache, config).await?;
    let growth = station_growth(&stations.records, config.min_year, config.trend_top_n);

    if options.export {
        write_records(&options.output_dir.join(STATION_GROWTH_EXPORT), &growth.full)?;
    }

    let chart = Chart::Line(growth.chart(config.min_year));
    Ok(render_png(&chart, &options.output_dir.join(STATION_GROWTH_CHART))?)
}

fn log_outcome(analysis: &str, outcome: &Result<Rendered<PathBuf>>) {
    match outcome {
        Ok(Rendered::Chart(path)) => info!(analysis, path = %path.display(), "Chart generated"),
        Ok(Rendered::Warning(message)) => warn!(analysis, reason = %message, "No chart generated"),
        Err(e) => error!(analysis, error = %format!("{e:#}"), "Analysis failed"),
    }
}
