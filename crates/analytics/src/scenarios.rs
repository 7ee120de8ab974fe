use crate::error::AnalyticsError;
use crate::forecast::{scale, weighted_total};
use crate::report::{Scenario, ScenarioKind};
use crate::stats::quartiles;
use configuration::ScenarioSettings;
use core_types::{Opportunity, StageProbabilities};
use rust_decimal::Decimal;

/// Best, expected and worst case forecasts.
///
/// `base_rates` are the per-stage rates of the expected case. `cycle_lengths`
/// are time-to-win samples; their 25th, 50th and 75th percentile give best,
/// expected and worst. With no samples every scenario uses the configured fallback.
pub fn calculate(
    opportunities: &[Opportunity],
    base_rates: &StageProbabilities,
    cycle_lengths: &[Decimal],
    settings: &ScenarioSettings,
) -> Result<Vec<Scenario>, AnalyticsError> {
    let [p25, median, p75] =
        quartiles(cycle_lengths).unwrap_or([settings.fallback_cycle_days; 3]);

    let cases = [
        (ScenarioKind::Best, scale(base_rates, settings.upside_multiplier)?, p25),
        (ScenarioKind::Expected, base_rates.clone(), median),
        (ScenarioKind::Worst, scale(base_rates, settings.downside_multiplier)?, p75),
    ];

    cases
        .into_iter()
        .map(|(kind, rates, cycle_days)| {
            Ok(Scenario {
                kind,
                forecast: weighted_total(opportunities, &rates)?,
                rates,
                cycle_days,
            })
        })
        .collect()
}
