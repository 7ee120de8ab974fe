use crate::report::{DataQualityIssue, DataQualitySummary, DataQualityWarning, MetricKind};
use core_types::Opportunity;

/// Lists every record that individual metrics will skip, and why.
///
/// The metric modules skip these records on their own; this scan only makes
/// the exclusions visible in the report.
pub fn assess(opportunities: &[Opportunity]) -> DataQualitySummary {
    let mut summary = DataQualitySummary::default();

    for opp in opportunities {
        if opp.is_closed() && opp.last_stage.is_none() {
            summary.closed_without_last_stage += 1;
            push(
                &mut summary,
                opp,
                DataQualityIssue::ClosedWithoutLastStage,
                vec![MetricKind::WinRates, MetricKind::Funnel],
            );
        }

        if opp.created_date.is_none() {
            summary.missing_created_date += 1;
            let excluded_from = if opp.is_open() {
                vec![MetricKind::AtRisk, MetricKind::Cohorts]
            } else {
                vec![MetricKind::Cycle, MetricKind::Cohorts]
            };
            push(&mut summary, opp, DataQualityIssue::MissingCreatedDate, excluded_from);
        }

        if opp.is_closed() && opp.close_date.is_none() {
            summary.missing_close_date += 1;
            push(
                &mut summary,
                opp,
                DataQualityIssue::MissingCloseDate,
                vec![MetricKind::Cycle, MetricKind::Trends],
            );
        }
    }

    if !summary.is_clean() {
        tracing::warn!(
            excluded_records = summary.excluded_records(),
            closed_without_last_stage = summary.closed_without_last_stage,
            missing_created_date = summary.missing_created_date,
            missing_close_date = summary.missing_close_date,
            "Some records were excluded from individual metrics."
        );
    }

    summary
}

fn push(
    summary: &mut DataQualitySummary,
    opp: &Opportunity,
    issue: DataQualityIssue,
    excluded_from: Vec<MetricKind>,
) {
    tracing::debug!(opportunity = %opp.id, ?issue, ?excluded_from, "Record excluded from metrics.");
    summary.warnings.push(DataQualityWarning {
        opportunity_id: opp.id.clone(),
        issue,
        excluded_from,
    });
}
