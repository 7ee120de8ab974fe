use analytics::MetricsEngine;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::IntoResponse;
use chrono::NaiveDate;
use configuration::ProbabilitySource;
use core_types::{Opportunity, Stage, StageProbabilities, Status};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;
use web_server::handlers::{self, ReportQuery};
use web_server::AppState;

fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

fn open(id: &str, amount: Decimal, stage: Stage, created: &str, owner: &str) -> Opportunity {
    Opportunity {
        id: id.to_string(),
        name: format!("Deal {id}"),
        amount,
        stage: Some(stage),
        status: Status::Open,
        created_date: Some(date(created)),
        close_date: None,
        owner: owner.to_string(),
        last_stage: None,
    }
}

fn state_with(probabilities: StageProbabilities) -> Arc<AppState> {
    let mut won = open("W1", dec!(80000), Stage::Proposal, "2023-11-01", "Morgan");
    won.status = Status::Won;
    won.stage = None;
    won.last_stage = Some(Stage::Proposal);
    won.close_date = Some(date("2023-12-15"));

    Arc::new(AppState {
        opportunities: Arc::new(vec![
            open("A", dec!(100000), Stage::Discovery, "2024-01-10", "Morgan"),
            open("B", dec!(200000), Stage::Proposal, "2024-02-10", "Jordan"),
            won,
        ]),
        engine: MetricsEngine::default(),
        probabilities,
        source: ProbabilitySource::Configured,
    })
}

fn state() -> Arc<AppState> {
    state_with(StageProbabilities::default())
}

fn query(as_of: &str) -> ReportQuery {
    ReportQuery {
        as_of: Some(date(as_of)),
        ..ReportQuery::default()
    }
}

#[tokio::test]
async fn report_covers_the_whole_snapshot_without_filters() {
    let report = handlers::get_report(State(state()), Query(query("2024-03-01")))
        .await
        .unwrap()
        .0;
    assert_eq!(report.forecast.total_pipeline, dec!(300000));
    assert_eq!(report.forecast.weighted_forecast, dec!(110000));
    assert_eq!(report.as_of, date("2024-03-01"));
}

#[tokio::test]
async fn filters_narrow_the_report() {
    let mut filtered = query("2024-03-01");
    filtered.owners = Some("Jordan".to_string());
    let report = handlers::get_report(State(state()), Query(filtered))
        .await
        .unwrap()
        .0;
    assert_eq!(report.forecast.open_count, 1);
    assert_eq!(report.forecast.total_pipeline, dec!(200000));

    let mut by_stage = query("2024-03-01");
    by_stage.stages = Some("discovery, ".to_string());
    let report = handlers::get_report(State(state()), Query(by_stage))
        .await
        .unwrap()
        .0;
    assert_eq!(report.forecast.total_pipeline, dec!(100000));
    // Closed history is kept by the stage filter.
    assert_eq!(report.win_rates.closed, 1);
}

#[tokio::test]
async fn unknown_stage_is_a_bad_request() {
    let mut bad = query("2024-03-01");
    bad.stages = Some("Closing".to_string());
    let response = handlers::get_report(State(state()), Query(bad))
        .await
        .unwrap_err()
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_probability_is_a_bad_request() {
    let partial =
        StageProbabilities::new(BTreeMap::from([(Stage::Discovery, dec!(0.10))])).unwrap();
    let response = handlers::get_report(State(state_with(partial)), Query(query("2024-03-01")))
        .await
        .unwrap_err()
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn probability_overrides_change_the_weighted_forecast() {
    let uri: Uri = "/api/report?as_of=2024-03-01&discovery=50&proposal=50"
        .parse()
        .unwrap();
    let query = Query::<ReportQuery>::try_from_uri(&uri).unwrap();
    let report = handlers::get_report(State(state()), query)
        .await
        .unwrap()
        .0;
    assert_eq!(report.forecast.weighted_forecast, dec!(150000));
    assert_eq!(report.probabilities.get(Stage::Discovery), Some(dec!(0.5)));
    // Untouched stages keep the configured value.
    assert_eq!(report.probabilities.get(Stage::Demo), Some(dec!(0.30)));
}

#[tokio::test]
async fn out_of_range_override_is_a_bad_request() {
    let mut bad = query("2024-03-01");
    bad.negotiation = Some(dec!(150));
    let response = handlers::get_report(State(state()), Query(bad))
        .await
        .unwrap_err()
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owners_are_distinct_and_sorted() {
    let owners = handlers::get_owners(State(state())).await.0;
    assert_eq!(owners, vec!["Jordan".to_string(), "Morgan".to_string()]);
}

#[tokio::test]
async fn charts_follow_the_report() {
    let charts = handlers::get_charts(State(state()), Query(query("2024-03-01")))
        .await
        .unwrap()
        .0;
    assert_eq!(charts.len(), 6);
    assert_eq!(charts[0].id, "pipeline_waterfall");
}

#[tokio::test]
async fn export_is_a_csv_attachment() {
    let response = handlers::export_csv(State(state()), Query(query("2024-03-01")))
        .await
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"forecast_20240301.csv\""
    );
}
