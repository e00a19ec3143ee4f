//! Interactive dashboard served over HTTP.
//!
//! Every page load reruns the pipeline over cached resources and renders
//! the charts as inline SVG, filtered by the municipality chosen in the
//! page's single selector.

pub mod page;
pub mod routes;
pub mod state;
pub mod view;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

pub use state::AppState;
pub use view::DashboardView;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .with_state(state)
}

/// Binds `addr` and serves the dashboard until the process is stopped.
pub async fn serve(state: Arc<AppState>, addr: &str) -> anyhow::Result<()> {
    crate::charts::ensure_font()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "Dashboard listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
