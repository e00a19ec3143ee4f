use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;
use tracing::warn;

use crate::dashboard::page;
use crate::dashboard::state::AppState;
use crate::dashboard::view::DashboardView;
use crate::normalize::{filter_sale_state, filter_station_state};
use crate::pipeline::{load_sales, load_stations};

/// Value of the filter that selects every municipality.
pub const ALL_MUNICIPALITIES: &str = "Todos";

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub municipio: Option<String>,
}

impl DashboardQuery {
    /// The requested municipality, or `None` for all of them.
    pub fn municipality(&self) -> Option<&str> {
        self.municipio
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty() && *m != ALL_MUNICIPALITIES)
    }
}

/// GET /
///
/// Runs the whole pipeline for the requested municipality. Fetches go
/// through the session cache; load failures show up as inline warnings.
#[tracing::instrument(skip_all, fields(municipio = ?query.municipio))]
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Html<String> {
    let view = build_view(&state, query.municipality()).await;
    Html(page::render(&view))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

pub async fn build_view(state: &AppState, municipality: Option<&str>) -> DashboardView {
    let config = &state.config;
    let mut warnings = Vec::new();

    let stations = match load_stations(&state.client, &state.cache, config).await {
        Ok(n) => Some(filter_station_state(n.records, &config.dashboard_state)),
        Err(e) => {
            warn!(error = %e, "Station registry unavailable");
            warnings.push(format!("Erro ao carregar os dados de postos: {e}"));
            None
        }
    };

    let sales = match load_sales(&state.client, &state.cache, config).await {
        Ok(n) => Some(filter_sale_state(n.records, &config.dashboard_state)),
        Err(e) => {
            warn!(error = %e, "Sales ledger unavailable");
            warnings.push(format!("Erro ao carregar os dados de vendas: {e}"));
            None
        }
    };

    DashboardView::build(config, stations, sales, municipality, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const STATIONS: &[u8] = b"UF;MUNICIPIO;BANDEIRA;DATAVINCULACAO\n\
        RJ;NITEROI;IPIRANGA;15/03/2001\n\
        RJ;S\xc3O GON\xc7ALO;BRANCA;02/07/2012\n\
        SP;SANTOS;SHELL;01/01/2010\n";

    fn state_with(stations: &str, sales: &str) -> Arc<AppState> {
        let config = Config {
            stations_source: stations.to_string(),
            sales_source: sales.to_string(),
            ..Config::default()
        };
        Arc::new(AppState::new(config).unwrap())
    }

    #[test]
    fn test_query_municipality() {
        let query = |m: Option<&str>| DashboardQuery {
            municipio: m.map(str::to_string),
        };
        assert_eq!(query(None).municipality(), None);
        assert_eq!(query(Some("Todos")).municipality(), None);
        assert_eq!(query(Some("  ")).municipality(), None);
        assert_eq!(query(Some("NITEROI")).municipality(), Some("NITEROI"));
    }

    #[tokio::test]
    async fn test_missing_sales_degrades_to_warning() {
        let dir = tempfile::tempdir().unwrap();
        let stations = dir.path().join("postos.csv");
        std::fs::write(&stations, STATIONS).unwrap();

        let state = state_with(
            stations.to_str().unwrap(),
            "/nonexistent/fuel_market/vendas.csv",
        );
        let view = build_view(&state, None).await;

        assert_eq!(view.total_stations, 2);
        assert_eq!(view.municipalities, vec!["NITEROI", "SÃO GONÇALO"]);
        assert_eq!(view.agents, None);
        assert_eq!(view.warnings.len(), 1);
        assert!(view.warnings[0].contains("vendas"));
    }

    #[tokio::test]
    async fn test_index_renders_page() {
        let dir = tempfile::tempdir().unwrap();
        let stations = dir.path().join("postos.csv");
        std::fs::write(&stations, STATIONS).unwrap();
        let state = state_with(stations.to_str().unwrap(), "/nonexistent/vendas.csv");

        let Html(html) = index(
            State(state.clone()),
            Query(DashboardQuery {
                municipio: Some("NITEROI".to_string()),
            }),
        )
        .await;

        assert!(html.contains("Resumo para: NITEROI"));
        assert!(html.contains("Erro ao carregar os dados de vendas"));
        assert_eq!(state.cache.len(), 1);
    }
}
