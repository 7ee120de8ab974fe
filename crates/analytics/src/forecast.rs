use crate::error::AnalyticsError;
use crate::report::{ForecastComparison, PipelineDeal, PipelineForecast, StageForecast};
use chrono::NaiveDate;
use configuration::ScenarioSettings;
use core_types::{Opportunity, Stage, StageProbabilities};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Open deals paired with their stage. Open deals without a stage cannot be
/// weighted and are skipped (the loader never produces them).
pub(crate) fn open_deals(
    opportunities: &[Opportunity],
) -> impl Iterator<Item = (&Opportunity, Stage)> {
    opportunities
        .iter()
        .filter(|opp| opp.is_open())
        .filter_map(|opp| opp.stage.map(|stage| (opp, stage)))
}

pub(crate) fn probability_for(
    probabilities: &StageProbabilities,
    stage: Stage,
) -> Result<Decimal, AnalyticsError> {
    probabilities
        .get(stage)
        .ok_or(AnalyticsError::MissingProbability(stage))
}

/// Weighted pipeline forecast with per-stage subtotals.
///
/// Fails when an open deal sits in a stage without a configured probability.
pub fn calculate(
    opportunities: &[Opportunity],
    probabilities: &StageProbabilities,
) -> Result<PipelineForecast, AnalyticsError> {
    let mut by_stage: BTreeMap<Stage, StageForecast> = BTreeMap::new();

    for (opp, stage) in open_deals(opportunities) {
        let probability = probability_for(probabilities, stage)?;
        let entry = by_stage.entry(stage).or_insert_with(|| StageForecast {
            stage,
            count: 0,
            total_amount: Decimal::ZERO,
            probability,
            weighted_amount: Decimal::ZERO,
        });
        entry.count += 1;
        entry.total_amount += opp.amount;
        entry.weighted_amount += opp.amount * probability;
    }

    let stages: Vec<StageForecast> = by_stage.into_values().collect();
    Ok(PipelineForecast {
        open_count: stages.iter().map(|s| s.count).sum(),
        total_pipeline: stages.iter().map(|s| s.total_amount).sum(),
        weighted_forecast: stages.iter().map(|s| s.weighted_amount).sum(),
        stages,
    })
}

/// Σ amount × probability over open deals.
pub fn weighted_total(
    opportunities: &[Opportunity],
    probabilities: &StageProbabilities,
) -> Result<Decimal, AnalyticsError> {
    open_deals(opportunities).try_fold(Decimal::ZERO, |total, (opp, stage)| {
        Ok(total + opp.amount * probability_for(probabilities, stage)?)
    })
}

/// Every open deal with its probability and weighted amount, in input order.
pub fn pipeline_deals(
    opportunities: &[Opportunity],
    probabilities: &StageProbabilities,
    as_of: NaiveDate,
) -> Result<Vec<PipelineDeal>, AnalyticsError> {
    open_deals(opportunities)
        .map(|(opp, stage)| {
            let probability = probability_for(probabilities, stage)?;
            Ok(PipelineDeal {
                id: opp.id.clone(),
                name: opp.name.clone(),
                owner: opp.owner.clone(),
                stage,
                amount: opp.amount,
                probability,
                weighted_amount: opp.amount * probability,
                created_date: opp.created_date,
                close_date: opp.close_date,
                age_days: opp.age_on(as_of),
            })
        })
        .collect()
}

/// Forecasts the open pipeline under the configured, historical, optimistic and
/// conservative assumptions, next to the unweighted total.
pub fn compare(
    opportunities: &[Opportunity],
    configured: &StageProbabilities,
    historical: &StageProbabilities,
    settings: &ScenarioSettings,
) -> Result<ForecastComparison, AnalyticsError> {
    let optimistic = scale(historical, settings.optimistic_multiplier)?;
    let conservative = scale(historical, settings.conservative_multiplier)?;

    Ok(ForecastComparison {
        conservative: weighted_total(opportunities, &conservative)?,
        standard: weighted_total(opportunities, configured)?,
        historical: weighted_total(opportunities, historical)?,
        optimistic: weighted_total(opportunities, &optimistic)?,
        total_pipeline: open_deals(opportunities).map(|(opp, _)| opp.amount).sum(),
    })
}

/// Multiplies every probability by `factor`, capped at 1.
pub(crate) fn scale(
    probabilities: &StageProbabilities,
    factor: Decimal,
) -> Result<StageProbabilities, AnalyticsError> {
    let scaled = probabilities
        .iter()
        .map(|(stage, value)| (stage, (value * factor).min(Decimal::ONE)))
        .collect();
    Ok(StageProbabilities::new(scaled)?)
}
