//! Data behind one dashboard page, independent of how it is rendered.

use crate::analyzers::types::{SaleRecord, StationRecord};
use crate::config::Config;
use crate::error::AnalysisError;
use crate::pipeline::{
    GrowthTrend, Ranking, ShareTrend, agent_volume_ranking, brand_ranking, filter_municipality,
    market_share_trend, municipalities, station_growth,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub state_code: String,
    pub municipalities: Vec<String>,
    /// `None` means every municipality.
    pub selected: Option<String>,
    pub total_stations: usize,
    pub brands: Ranking,
    /// `None` when the sales dataset could not be loaded.
    pub agents: Option<Ranking>,
    pub share_trend: Option<Result<ShareTrend, AnalysisError>>,
    pub growth: GrowthTrend,
    pub min_year: i32,
    /// Inline warnings shown above the panels.
    pub warnings: Vec<String>,
}

impl DashboardView {
    /// Assembles the page data. Missing datasets degrade to empty panels.
    ///
    /// `selected` is ignored when it names no known municipality.
    pub fn build(
        config: &Config,
        stations: Option<Vec<StationRecord>>,
        sales: Option<Vec<SaleRecord>>,
        selected: Option<&str>,
        mut warnings: Vec<String>,
    ) -> Self {
        let stations = stations.unwrap_or_default();
        let municipalities = municipalities(&stations);

        let selected = match selected {
            Some(m) if municipalities.iter().any(|known| known == m) => Some(m.to_string()),
            Some(m) => {
                warnings.push(format!("Município desconhecido: {m}"));
                None
            }
            None => None,
        };
        let filtered = filter_municipality(&stations, selected.as_deref());

        let agents = sales
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| agent_volume_ranking(s, config.ranking_top_n));
        let share_trend = sales
            .as_deref()
            .map(|s| market_share_trend(s, config.trend_top_n));

        Self {
            state_code: config.dashboard_state.clone(),
            municipalities,
            selected,
            total_stations: filtered.len(),
            brands: brand_ranking(&filtered, config.ranking_top_n),
            agents,
            share_trend,
            growth: station_growth(&filtered, config.min_year, config.trend_top_n),
            min_year: config.min_year,
            warnings,
        }
    }

    pub fn distinct_brands(&self) -> usize {
        self.brands.full.len()
    }

    /// Total sales volume in thousands of m³, when sales are available.
    pub fn total_volume(&self) -> Option<f64> {
        self.agents.as_ref().map(Ranking::total)
    }

    pub fn selected_label(&self) -> &str {
        self.selected.as_deref().unwrap_or("Todos")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn station(municipality: &str, brand: &str, year: i32) -> StationRecord {
        StationRecord {
            state: "RJ".to_string(),
            municipality: municipality.to_string(),
            brand: brand.to_string(),
            affiliation_date: NaiveDate::from_ymd_opt(year, 1, 10).unwrap(),
        }
    }

    fn sale(year: i32, agent: &str, volume: f64) -> SaleRecord {
        SaleRecord {
            year,
            destination_state: "RJ".to_string(),
            agent: agent.to_string(),
            volume,
        }
    }

    fn stations() -> Vec<StationRecord> {
        vec![
            station("NITEROI", "IPIRANGA", 2001),
            station("NITEROI", "SHELL", 2003),
            station("MARICA", "IPIRANGA", 2005),
            station("MARICA", "BRANCA", 2010),
        ]
    }

    #[test]
    fn test_build_all_municipalities() {
        let sales = vec![sale(2020, "A", 2.0), sale(2021, "A", 1.0), sale(2021, "B", 3.0)];
        let view = DashboardView::build(
            &Config::default(),
            Some(stations()),
            Some(sales),
            None,
            vec![],
        );

        assert_eq!(view.municipalities, vec!["MARICA", "NITEROI"]);
        assert_eq!(view.selected_label(), "Todos");
        assert_eq!(view.total_stations, 4);
        assert_eq!(view.distinct_brands(), 3);
        assert_eq!(view.total_volume(), Some(6.0));
        assert!(matches!(view.share_trend, Some(Ok(_))));
        assert!(view.warnings.is_empty());
    }

    #[test]
    fn test_build_filters_stations_not_sales() {
        let sales = vec![sale(2020, "A", 2.0), sale(2021, "B", 3.0)];
        let view = DashboardView::build(
            &Config::default(),
            Some(stations()),
            Some(sales),
            Some("NITEROI"),
            vec![],
        );

        assert_eq!(view.selected.as_deref(), Some("NITEROI"));
        assert_eq!(view.total_stations, 2);
        assert_eq!(view.total_volume(), Some(5.0));
        assert_eq!(view.municipalities.len(), 2);
    }

    #[test]
    fn test_unknown_municipality_falls_back_to_all() {
        let view = DashboardView::build(
            &Config::default(),
            Some(stations()),
            None,
            Some("PARATY"),
            vec![],
        );
        assert_eq!(view.selected, None);
        assert_eq!(view.total_stations, 4);
        assert_eq!(view.warnings.len(), 1);
    }

    #[test]
    fn test_missing_datasets_degrade() {
        let view = DashboardView::build(
            &Config::default(),
            None,
            None,
            None,
            vec!["Erro ao carregar".to_string()],
        );
        assert_eq!(view.total_stations, 0);
        assert!(view.brands.is_empty());
        assert_eq!(view.agents, None);
        assert_eq!(view.total_volume(), None);
        assert_eq!(view.share_trend, None);
        assert!(view.growth.full.is_empty());
    }

    #[test]
    fn test_empty_sales_have_no_ranking() {
        let view = DashboardView::build(
            &Config::default(),
            Some(stations()),
            Some(vec![]),
            None,
            vec![],
        );
        assert_eq!(view.agents, None);
        assert!(matches!(
            view.share_trend,
            Some(Err(AnalysisError::InsufficientYears { distinct: 0 }))
        ));
    }
}
