use analytics::MetricsEngine;
use axum::{Router, routing::get};
use configuration::ProbabilitySource;
use core_types::{Opportunity, StageProbabilities};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
///
/// The record set is loaded once at startup and only read afterwards; every
/// request filters its own copy of the selection.
#[derive(Debug, Clone)]
pub struct AppState {
    pub opportunities: Arc<Vec<Opportunity>>,
    pub engine: MetricsEngine,
    pub probabilities: StageProbabilities,
    /// Used when a request does not name a source.
    pub source: ProbabilitySource,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/report", get(handlers::get_report))
        .route("/api/charts", get(handlers::get_charts))
        .route("/api/owners", get(handlers::get_owners))
        .route("/api/export.csv", get(handlers::export_csv))
        .with_state(Arc::new(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// The main function to configure and run the web server.
pub async fn run_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let records = state.opportunities.len();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, records, "Dashboard listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
