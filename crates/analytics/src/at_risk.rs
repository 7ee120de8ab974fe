use crate::forecast::open_deals;
use crate::report::{AtRiskAnalysis, AtRiskOpportunity};
use chrono::NaiveDate;
use core_types::Opportunity;
use rust_decimal::Decimal;

/// Open deals older than the average cycle on `as_of`, oldest first.
///
/// Without an average cycle nothing is flagged. Open deals without a created
/// date cannot be aged and are skipped.
pub fn detect(
    opportunities: &[Opportunity],
    avg_cycle_days: Option<Decimal>,
    as_of: NaiveDate,
) -> AtRiskAnalysis {
    let Some(threshold) = avg_cycle_days else {
        return AtRiskAnalysis::default();
    };

    let mut flagged: Vec<AtRiskOpportunity> = open_deals(opportunities)
        .filter_map(|(opp, stage)| {
            let age_days = opp.age_on(as_of)?;
            let age = Decimal::from(age_days);
            (age > threshold).then(|| AtRiskOpportunity {
                id: opp.id.clone(),
                name: opp.name.clone(),
                owner: opp.owner.clone(),
                stage,
                amount: opp.amount,
                age_days,
                days_over: age - threshold,
            })
        })
        .collect();

    flagged.sort_by(|a, b| b.age_days.cmp(&a.age_days).then_with(|| a.id.cmp(&b.id)));

    AtRiskAnalysis {
        threshold_days: Some(threshold),
        total_amount: flagged.iter().map(|opp| opp.amount).sum(),
        opportunities: flagged,
    }
}
