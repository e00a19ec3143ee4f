//! Runtime configuration.
//!
//! Every setting has a built-in default, so the tool runs with no flags,
//! file or environment. Optional overrides come from `FUEL_*` variables
//! (a `.env` file is loaded by the binary before [`Config::from_env`]).

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

use crate::analyzers::select::{DEFAULT_RANKING_TOP_N, DEFAULT_TREND_TOP_N};
use crate::fetch::TextEncoding;

pub const SALES_URL: &str =
    "https://github.com/filipe381/Ap1Tic/releases/download/dados/liquidos_Vendas_Atual.csv";

pub const STATIONS_URL: &str = "https://www.gov.br/anp/pt-br/centrais-de-conteudo/dados-abertos/arquivos/arquivos-dados-cadastrais-dos-revendedores-varejistas-de-combustiveis-automotivos/dados-cadastrais-revendedores-varejistas-combustiveis-automoveis.csv";

/// Stations affiliated before this year are left out of growth trends.
pub const DEFAULT_MIN_YEAR: i32 = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// URL or local path of the wholesale sales ledger.
    pub sales_source: String,
    /// URL or local path of the retail station registry.
    pub stations_source: String,
    pub encoding: TextEncoding,
    pub delimiter: u8,
    /// State (UF) the dashboard is restricted to.
    pub dashboard_state: String,
    pub min_year: i32,
    pub trend_top_n: usize,
    pub ranking_top_n: usize,
    /// `None` keeps fetched resources for the whole session.
    pub cache_ttl: Option<Duration>,
    pub http_timeout: Duration,
    /// Fraction of dropped lines above which a dataset is flagged in the logs.
    pub max_drop_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sales_source: SALES_URL.to_string(),
            stations_source: STATIONS_URL.to_string(),
            encoding: TextEncoding::Latin1,
            delimiter: crate::parser::DEFAULT_DELIMITER,
            dashboard_state: "RJ".to_string(),
            min_year: DEFAULT_MIN_YEAR,
            trend_top_n: DEFAULT_TREND_TOP_N,
            ranking_top_n: DEFAULT_RANKING_TOP_N,
            cache_ttl: None,
            http_timeout: Duration::from_secs(120),
            max_drop_rate: 0.05,
        }
    }
}

impl Config {
    /// Builds a config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let ttl_secs: u64 = parse_var(&get, "FUEL_CACHE_TTL_SECS", 0)?;
        let timeout_secs: u64 = parse_var(
            &get,
            "FUEL_HTTP_TIMEOUT_SECS",
            defaults.http_timeout.as_secs(),
        )?;
        let max_drop_rate: f64 = parse_var(&get, "FUEL_MAX_DROP_RATE", defaults.max_drop_rate)?;
        if !(0.0..=1.0).contains(&max_drop_rate) {
            anyhow::bail!("FUEL_MAX_DROP_RATE must be between 0 and 1, got {max_drop_rate}");
        }

        let encoding = match get("FUEL_ENCODING") {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("invalid FUEL_ENCODING")?,
            None => defaults.encoding,
        };

        Ok(Self {
            sales_source: get("FUEL_SALES_URL").unwrap_or(defaults.sales_source),
            stations_source: get("FUEL_STATIONS_URL").unwrap_or(defaults.stations_source),
            encoding,
            delimiter: defaults.delimiter,
            dashboard_state: get("FUEL_DASHBOARD_STATE")
                .map(|s| s.trim().to_uppercase())
                .unwrap_or(defaults.dashboard_state),
            min_year: parse_var(&get, "FUEL_MIN_YEAR", defaults.min_year)?,
            trend_top_n: parse_var(&get, "FUEL_TREND_TOP_N", defaults.trend_top_n)?,
            ranking_top_n: parse_var(&get, "FUEL_RANKING_TOP_N", defaults.ranking_top_n)?,
            cache_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            http_timeout: Duration::from_secs(timeout_secs),
            max_drop_rate,
        })
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: '{raw}'")),
        None => Ok(default),
    }
}
