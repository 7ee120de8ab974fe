use crate::error::AnalyticsError;
use crate::report::MetricsReport;
use crate::{at_risk, cohorts, cycle, forecast, funnel, quality, reps, scenarios, trends, win_rates};
use chrono::NaiveDate;
use configuration::{AnalysisSettings, ProbabilitySource};
use core_types::{Opportunity, StageProbabilities};

/// A stateless calculator that turns a set of opportunities into a `MetricsReport`.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    settings: AnalysisSettings,
}

impl MetricsEngine {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// The main entry point for calculating every pipeline metric.
    ///
    /// # Arguments
    ///
    /// * `opportunities` - The record set, already validated and filtered.
    /// * `probabilities` - The caller-supplied stage probabilities.
    /// * `source` - Whether to forecast with `probabilities` as given or with
    ///   historical win rates layered over them.
    /// * `as_of` - The reference date for ages and at-risk detection.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `MetricsReport`, or `AnalyticsError::MissingProbability`
    /// when an open deal sits in a stage the effective mapping does not cover.
    pub fn calculate(
        &self,
        opportunities: &[Opportunity],
        probabilities: &StageProbabilities,
        source: ProbabilitySource,
        as_of: NaiveDate,
    ) -> Result<MetricsReport, AnalyticsError> {
        tracing::debug!(
            records = opportunities.len(),
            ?source,
            %as_of,
            "Calculating pipeline metrics."
        );

        let win_rates = win_rates::calculate(opportunities);
        let merged = probabilities.overridden_by(&win_rates::to_probabilities(&win_rates));
        let effective = match source {
            ProbabilitySource::Configured => probabilities.clone(),
            ProbabilitySource::Historical => merged.clone(),
        };

        let forecast = forecast::calculate(opportunities, &effective)?;
        let pipeline = forecast::pipeline_deals(opportunities, &effective, as_of)?;

        let cycle = cycle::calculate(opportunities);
        let avg_won_deal_size = cycle::avg_won_deal_size(opportunities);
        let velocity = cycle::velocity(
            forecast.open_count,
            win_rates.overall_win_rate,
            avg_won_deal_size,
            cycle.avg_cycle_days,
        );
        let at_risk = at_risk::detect(opportunities, cycle.avg_cycle_days, as_of);

        let funnel = funnel::calculate(opportunities, as_of, &self.settings.funnel);
        let reps = reps::calculate(opportunities, &effective)?;
        let trends = trends::calculate(opportunities, &self.settings.trends, forecast.total_pipeline);
        let cohorts = cohorts::calculate(opportunities);

        let scenarios = scenarios::calculate(
            opportunities,
            &merged,
            &cycle::won_cycle_lengths(opportunities),
            &self.settings.scenarios,
        )?;
        let comparison =
            forecast::compare(opportunities, probabilities, &merged, &self.settings.scenarios)?;

        let report = MetricsReport {
            as_of,
            probability_source: source,
            probabilities: effective,
            confidence: win_rates::confidence(&win_rates),
            data_quality: quality::assess(opportunities),
            forecast,
            pipeline,
            win_rates,
            avg_won_deal_size,
            cycle,
            velocity,
            at_risk,
            funnel,
            reps,
            trends,
            cohorts,
            scenarios,
            comparison,
        };

        tracing::info!(
            open = report.forecast.open_count,
            total_pipeline = %report.forecast.total_pipeline,
            weighted_forecast = %report.forecast.weighted_forecast,
            at_risk = report.at_risk.opportunities.len(),
            "Pipeline metrics calculated."
        );

        Ok(report)
    }
}
