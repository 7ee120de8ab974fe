use crate::{AppState, error::AppError};
use analytics::{MetricsReport, OpportunityFilter};
use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse},
};
use chrono::NaiveDate;
use configuration::ProbabilitySource;
use core_types::{Stage, StageProbabilities};
use reporting::{Chart, charts, export};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

const DASHBOARD_PAGE: &str = include_str!("../static/dashboard.html");

/// Dashboard selection shared by the report, chart and export endpoints.
///
/// `owners` and `stages` are comma-separated lists. The four stage fields are
/// probability overrides in percent.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub owners: Option<String>,
    pub stages: Option<String>,
    pub source: Option<ProbabilitySource>,
    pub as_of: Option<NaiveDate>,
    pub discovery: Option<Decimal>,
    pub demo: Option<Decimal>,
    pub proposal: Option<Decimal>,
    pub negotiation: Option<Decimal>,
}

impl ReportQuery {
    pub fn filter(&self) -> Result<OpportunityFilter, AppError> {
        let stages = split_list(self.stages.as_deref())
            .map(|name| {
                name.parse::<Stage>()
                    .map_err(|e| AppError::InvalidQuery(e.to_string()))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(OpportunityFilter {
            created_from: self.from,
            created_to: self.to,
            owners: split_list(self.owners.as_deref()).map(str::to_string).collect(),
            stages,
        })
    }

    /// `base` with the requested per-stage overrides applied.
    pub fn probabilities(&self, base: &StageProbabilities) -> Result<StageProbabilities, AppError> {
        let overrides = [
            (Stage::Discovery, self.discovery),
            (Stage::Demo, self.demo),
            (Stage::Proposal, self.proposal),
            (Stage::Negotiation, self.negotiation),
        ];
        overrides
            .into_iter()
            .try_fold(base.clone(), |probabilities, (stage, percent)| match percent {
                Some(percent) => probabilities
                    .with(stage, percent / Decimal::ONE_HUNDRED)
                    .map_err(|_| {
                        AppError::InvalidQuery(format!(
                            "{stage} probability must be between 0 and 100, got {percent}"
                        ))
                    }),
                None => Ok(probabilities),
            })
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// Filters the snapshot and runs the engine for one request.
fn compute(state: &AppState, query: &ReportQuery) -> Result<MetricsReport, AppError> {
    let filter = query.filter()?;
    let probabilities = query.probabilities(&state.probabilities)?;
    let selection = filter.apply(&state.opportunities);
    let as_of = query
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let source = query.source.unwrap_or(state.source);

    tracing::debug!(
        selected = selection.len(),
        total = state.opportunities.len(),
        ?filter,
        "Computing dashboard report."
    );
    Ok(state
        .engine
        .calculate(&selection, &probabilities, source, as_of)?)
}

/// # GET /
pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD_PAGE)
}

/// # GET /api/report
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<MetricsReport>, AppError> {
    Ok(Json(compute(&state, &query)?))
}

/// # GET /api/charts
/// The Plotly figures for the current selection.
pub async fn get_charts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<Chart>>, AppError> {
    let report = compute(&state, &query)?;
    Ok(Json(charts::build_all(&report)))
}

/// # GET /api/owners
/// Every owner in the snapshot, for the filter controls.
pub async fn get_owners(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let owners: BTreeSet<&str> = state.opportunities.iter().map(|o| o.owner.as_str()).collect();
    Json(owners.into_iter().map(str::to_string).collect())
}

/// # GET /api/export.csv
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let report = compute(&state, &query)?;
    let body = export::forecast_csv_string(&report)?;
    let disposition = format!("attachment; filename=\"forecast_{}.csv\"", report.as_of.format("%Y%m%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
