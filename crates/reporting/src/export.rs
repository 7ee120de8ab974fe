use crate::error::ReportingError;
use crate::format::{date_cell, percent};
use analytics::MetricsReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 9] = [
    "Opportunity ID",
    "Opportunity Name",
    "Owner",
    "Stage",
    "Amount",
    "Probability",
    "Weighted Amount",
    "Created Date",
    "Close Date",
];

/// Writes one row per open deal followed by a `TOTAL FORECAST` summary row.
pub fn write_forecast_csv<W: Write>(report: &MetricsReport, writer: W) -> Result<(), ReportingError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;

    for deal in &report.pipeline {
        csv.write_record([
            deal.id.clone(),
            deal.name.clone(),
            deal.owner.clone(),
            deal.stage.to_string(),
            deal.amount.round_dp(2).to_string(),
            percent(deal.probability, 0),
            deal.weighted_amount.round_dp(2).to_string(),
            date_cell(deal.created_date),
            date_cell(deal.close_date),
        ])?;
    }

    csv.write_record([
        String::new(),
        "TOTAL FORECAST".to_string(),
        String::new(),
        String::new(),
        report.forecast.total_pipeline.round_dp(2).to_string(),
        String::new(),
        report.forecast.weighted_forecast.round_dp(2).to_string(),
        String::new(),
        String::new(),
    ])?;

    csv.flush()?;
    Ok(())
}

pub fn forecast_csv_string(report: &MetricsReport) -> Result<String, ReportingError> {
    let mut buffer = Vec::new();
    write_forecast_csv(report, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn write_forecast_file(report: &MetricsReport, path: &Path) -> Result<(), ReportingError> {
    let file = File::create(path).map_err(|source| ReportingError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_forecast_csv(report, file)?;
    tracing::info!(path = %path.display(), deals = report.pipeline.len(), "Forecast exported.");
    Ok(())
}
