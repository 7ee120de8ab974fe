use analytics::{MetricsEngine, MetricsReport};
use chrono::NaiveDate;
use configuration::{ProbabilitySource, ReportSettings};
use core_types::{Opportunity, Stage, StageProbabilities, Status};
use reporting::{charts, console, export};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

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

fn closed(id: &str, status: Status, stage: Stage, created: &str, close: &str) -> Opportunity {
    Opportunity {
        id: id.to_string(),
        name: format!("Deal {id}"),
        amount: dec!(50000),
        stage: None,
        status,
        created_date: Some(date(created)),
        close_date: Some(date(close)),
        owner: "Riley".to_string(),
        last_stage: Some(stage),
    }
}

fn report_with_open_deals(count: usize) -> MetricsReport {
    let mut records: Vec<Opportunity> = (0..count)
        .map(|i| open(&format!("O{i:02}"), dec!(10000), Stage::Demo, "2023-01-01", "Riley"))
        .collect();
    records.push(closed("W1", Status::Won, Stage::Proposal, "2023-06-01", "2023-07-01"));
    records.push(closed("L1", Status::Lost, Stage::Demo, "2023-06-01", "2023-07-11"));
    MetricsEngine::default()
        .calculate(
            &records,
            &StageProbabilities::default(),
            ProbabilitySource::Configured,
            date("2024-06-01"),
        )
        .unwrap()
}

#[test]
fn console_report_truncates_the_at_risk_list() {
    let report = report_with_open_deals(18);
    assert_eq!(report.at_risk.opportunities.len(), 18);

    let text = console::render(&report, &ReportSettings::default());
    assert!(text.contains("Weighted Pipeline"));
    assert!(text.contains("Showing top 15, 3 more not displayed"));
    assert!(text.contains("O14"));
    assert!(!text.contains("O15"));
}

#[test]
fn console_report_marks_missing_data() {
    let report = MetricsEngine::default()
        .calculate(
            &[open("O1", dec!(1000), Stage::Discovery, "2024-05-01", "Riley")],
            &StageProbabilities::default(),
            ProbabilitySource::Configured,
            date("2024-06-01"),
        )
        .unwrap();
    let text = console::render(&report, &ReportSettings::default());
    assert!(text.contains("Velocity: insufficient data"));
    assert!(text.contains("n/a"));
}

#[test]
fn forecast_csv_ends_with_a_total_row() {
    let report = report_with_open_deals(2);
    let csv = export::forecast_csv_string(&report).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("Opportunity ID,Opportunity Name,Owner,Stage,Amount"));
    assert_eq!(
        lines[1],
        "O00,Deal O00,Riley,Demo,10000,30%,3000.00,2023-01-01,"
    );
    assert_eq!(lines[3], ",TOTAL FORECAST,,,20000,,6000.00,,");
}

#[test]
fn forecast_file_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forecast.csv");
    export::write_forecast_file(&report_with_open_deals(1), &path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("TOTAL FORECAST"));
}

#[test]
fn every_chart_page_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let written = charts::write_all(&report_with_open_deals(3), dir.path()).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "pipeline_waterfall.html",
            "revenue_trend.html",
            "forecast_comparison.html",
            "conversion_funnel.html",
            "deal_analysis_scatter.html",
            "rep_performance.html",
        ]
    );

    let page = std::fs::read_to_string(&written[0]).unwrap();
    assert!(page.contains("Plotly.newPlot"));
    assert!(page.contains("\"waterfall\""));
}

#[test]
fn chart_pages_escape_script_terminators() {
    let mut report = report_with_open_deals(1);
    report.pipeline[0].name = "</script><b>".to_string();
    let page = charts::render_html(&charts::deal_analysis_scatter(&report)).unwrap();
    assert!(!page.contains("</script><b>"));
}
