use crate::error::LoadError;
use chrono::NaiveDate;
use core_types::{Opportunity, Stage, Status};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";
/// Largest accepted deal amount. Keeps every sum and projection the engine
/// derives from a snapshot well inside `Decimal` range.
const MAX_AMOUNT: Decimal = dec!(1000000000000000);

/// One row exactly as it appears in the export, before validation.
#[derive(Debug, Deserialize)]
struct RawOpportunity {
    opportunity_id: String,
    opportunity_name: String,
    amount: String,
    #[serde(default)]
    stage: Option<String>,
    status: String,
    #[serde(default)]
    created_date: Option<String>,
    #[serde(default)]
    close_date: Option<String>,
    owner: String,
    #[serde(default)]
    last_stage: Option<String>,
}

/// Reads and validates every opportunity in the CSV file at `path`.
pub fn load_opportunities(path: &Path) -> Result<Vec<Opportunity>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let opportunities = read_opportunities(file)?;
    tracing::info!(
        path = %path.display(),
        count = opportunities.len(),
        "Loaded opportunities."
    );
    Ok(opportunities)
}

/// Reads and validates opportunities from any CSV source with a header row.
///
/// The first invalid row aborts the load; the error carries its line number.
pub fn read_opportunities<R: Read>(source: R) -> Result<Vec<Opportunity>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    let headers = reader.headers()?.clone();

    let mut opportunities = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut record = csv::StringRecord::new();

    while reader.read_record(&mut record)? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let raw: RawOpportunity = record.deserialize(Some(&headers))?;
        let opportunity =
            validate(raw).map_err(|reason| LoadError::InvalidRecord { line, reason })?;

        if !seen_ids.insert(opportunity.id.clone()) {
            return Err(LoadError::InvalidRecord {
                line,
                reason: format!("duplicate opportunity id '{}'", opportunity.id),
            });
        }
        opportunities.push(opportunity);
    }

    Ok(opportunities)
}

fn validate(raw: RawOpportunity) -> Result<Opportunity, String> {
    if raw.opportunity_id.is_empty() {
        return Err("opportunity_id is empty".to_string());
    }

    let amount = Decimal::from_str(&raw.amount)
        .map_err(|_| format!("amount '{}' is not a number", raw.amount))?;
    if amount < Decimal::ZERO {
        return Err(format!("amount {amount} is negative"));
    }
    if amount > MAX_AMOUNT {
        return Err(format!("amount {amount} exceeds the supported maximum of {MAX_AMOUNT}"));
    }

    let status = Status::from_str(&raw.status).map_err(|e| e.to_string())?;
    let created_date = parse_date("created_date", raw.created_date.as_deref())?;
    let close_date = parse_date("close_date", raw.close_date.as_deref())?;
    if let (Some(created), Some(closed)) = (created_date, close_date) {
        if created > closed {
            return Err(format!("created_date {created} is after close_date {closed}"));
        }
    }

    let stage_column = non_empty(raw.stage.as_deref());
    let (stage, last_stage) = match status {
        Status::Open => {
            let text = stage_column.ok_or("open opportunity has no stage")?;
            let stage = Stage::from_str(text).map_err(|e| e.to_string())?;
            (Some(stage), None)
        }
        Status::Won | Status::Lost => {
            let last_stage = match non_empty(raw.last_stage.as_deref()) {
                Some(text) => Some(Stage::from_str(text).map_err(|e| e.to_string())?),
                // Older exports left the stage column at the closing stage.
                None => stage_column.and_then(|text| Stage::from_str(text).ok()),
            };
            (None, last_stage)
        }
    };

    Ok(Opportunity {
        id: raw.opportunity_id,
        name: raw.opportunity_name,
        amount,
        stage,
        status,
        created_date,
        close_date,
        owner: raw.owner,
        last_stage,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(column: &str, value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    non_empty(value)
        .map(|text| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map_err(|_| format!("{column} '{text}' is not a YYYY-MM-DD date"))
        })
        .transpose()
}
