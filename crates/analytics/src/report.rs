use chrono::NaiveDate;
use configuration::ProbabilitySource;
use core_types::{Stage, StageProbabilities, YearMonth};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The complete output of one `MetricsEngine` run.
///
/// Ratios and averages whose denominator can be zero are `Option`s: `None`
/// means "insufficient data" and is distinct from an observed zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub as_of: NaiveDate,
    pub probability_source: ProbabilitySource,
    /// The mapping the weighted forecast was computed with.
    pub probabilities: StageProbabilities,

    // I. Pipeline
    pub forecast: PipelineForecast,
    pub pipeline: Vec<PipelineDeal>,

    // II. Historical performance
    pub win_rates: HistoricalWinRates,
    pub avg_won_deal_size: Option<Decimal>,
    pub confidence: ForecastConfidence,

    // III. Time-based
    pub cycle: CycleAnalysis,
    pub velocity: VelocityAnalysis,
    pub at_risk: AtRiskAnalysis,

    // IV. Breakdown
    pub funnel: FunnelAnalysis,
    pub reps: Vec<RepPerformance>,
    pub trends: TrendAnalysis,
    pub cohorts: CohortAnalysis,

    // V. What-if
    pub scenarios: Vec<Scenario>,
    pub comparison: ForecastComparison,

    pub data_quality: DataQualitySummary,
}

// ==============================================================================
// Weighted pipeline
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineForecast {
    pub open_count: usize,
    pub total_pipeline: Decimal,
    pub weighted_forecast: Decimal,
    /// Stages with at least one open deal, in canonical order.
    pub stages: Vec<StageForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageForecast {
    pub stage: Stage,
    pub count: usize,
    pub total_amount: Decimal,
    pub probability: Decimal,
    pub weighted_amount: Decimal,
}

/// One open deal as it contributes to the forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDeal {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub stage: Stage,
    pub amount: Decimal,
    pub probability: Decimal,
    pub weighted_amount: Decimal,
    pub created_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub age_days: Option<i64>,
}

// ==============================================================================
// Historical win rates
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalWinRates {
    /// Every stage in canonical order, including those without closed deals.
    pub stages: Vec<StageWinRate>,
    /// Totals over every closed deal, with or without a recorded last stage.
    pub won: usize,
    pub lost: usize,
    pub closed: usize,
    pub overall_win_rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageWinRate {
    pub stage: Stage,
    pub won: usize,
    pub lost: usize,
    pub win_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// How much closed history backs the historical rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfidence {
    pub level: ConfidenceLevel,
    pub sample_size: usize,
}

// ==============================================================================
// Cycle, velocity, risk
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleAnalysis {
    pub avg_cycle_days: Option<Decimal>,
    pub median_cycle_days: Option<Decimal>,
    pub avg_won_cycle_days: Option<Decimal>,
    /// Closed deals with both dates.
    pub sample_size: usize,
    /// Cycle statistics grouped by the stage deals closed from.
    pub by_stage: Vec<StageCycle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCycle {
    pub stage: Stage,
    pub count: usize,
    pub avg_days: Decimal,
    pub median_days: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityAnalysis {
    pub open_count: usize,
    pub win_rate: Option<Decimal>,
    pub avg_deal_size: Option<Decimal>,
    pub avg_cycle_days: Option<Decimal>,
    /// Modeled revenue per day; `None` when any input is undefined or the cycle is zero.
    pub velocity_per_day: Option<Decimal>,
    pub projections: Vec<RevenueProjection>,
    pub annualized: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueProjection {
    pub days: u32,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtRiskAnalysis {
    /// The average cycle the deals are compared against; `None` disables detection.
    pub threshold_days: Option<Decimal>,
    /// Sorted by age, oldest first.
    pub opportunities: Vec<AtRiskOpportunity>,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtRiskOpportunity {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub stage: Stage,
    pub amount: Decimal,
    pub age_days: i64,
    pub days_over: Decimal,
}

// ==============================================================================
// Funnel
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelAnalysis {
    pub stages: Vec<FunnelStage>,
    pub transitions: Vec<StageTransition>,
    /// The transition with the largest positive drop-off.
    pub biggest_bottleneck: Option<StageTransition>,
    pub slowest_stage: Option<Stage>,
    pub stickiest_stage: Option<Stage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: Stage,
    /// Deals that reached this stage or a later one.
    pub entered: usize,
    pub currently_in_stage: usize,
    pub won_from_here: usize,
    pub lost_from_here: usize,
    /// Estimated by spreading each deal's age (or cycle) evenly over the stages it passed.
    pub avg_days_in_stage: Option<Decimal>,
    pub stuck_count: usize,
}

/// Stage-to-stage movement; rates are relative to the preceding stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub from_count: usize,
    pub to_count: usize,
    pub dropped: usize,
    pub conversion_rate: Option<Decimal>,
    pub drop_off_rate: Option<Decimal>,
}

// ==============================================================================
// Reps, trends, cohorts
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepPerformance {
    pub owner: String,
    pub open_count: usize,
    pub open_pipeline: Decimal,
    pub weighted_forecast: Decimal,
    pub won_count: usize,
    pub lost_count: usize,
    pub win_rate: Option<Decimal>,
    pub won_amount: Decimal,
    pub avg_deal_size: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    #[default]
    Stable,
    Declining,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    /// Closed deals grouped by close month, chronological.
    pub months: Vec<MonthlyRevenue>,
    pub revenue_trend: TrendDirection,
    pub win_rate_trend: TrendDirection,
    /// Mean revenue over the trailing window; `None` with fewer months than the window.
    pub avg_monthly_revenue: Option<Decimal>,
    pub avg_win_rate: Option<Decimal>,
    /// Flat projection of `avg_monthly_revenue` over the following months.
    pub projection: Vec<ProjectedMonth>,
    pub next_quarter_projection: Option<Decimal>,
    pub current_pipeline: Decimal,
    pub quarterly_quota: Decimal,
    pub pipeline_coverage: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: YearMonth,
    pub revenue: Decimal,
    pub won_count: usize,
    pub lost_count: usize,
    pub win_rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedMonth {
    pub month: YearMonth,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortAnalysis {
    /// Deals grouped by created month, chronological.
    pub cohorts: Vec<Cohort>,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    pub month: YearMonth,
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub open: usize,
    /// Share of the cohort that has closed either way.
    pub conversion_rate: Option<Decimal>,
    pub win_rate: Option<Decimal>,
    pub avg_days_to_close: Option<Decimal>,
}

// ==============================================================================
// Scenarios and comparison
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Best,
    Expected,
    Worst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub rates: StageProbabilities,
    pub cycle_days: Decimal,
    pub forecast: Decimal,
}

/// The same open pipeline forecast under different probability assumptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastComparison {
    pub conservative: Decimal,
    pub standard: Decimal,
    pub historical: Decimal,
    pub optimistic: Decimal,
    pub total_pipeline: Decimal,
}

// ==============================================================================
// Data quality
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityIssue {
    ClosedWithoutLastStage,
    MissingCreatedDate,
    MissingCloseDate,
}

/// The metric families a record was left out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    WinRates,
    Funnel,
    Cycle,
    AtRisk,
    Trends,
    Cohorts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    pub opportunity_id: String,
    pub issue: DataQualityIssue,
    pub excluded_from: Vec<MetricKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualitySummary {
    pub closed_without_last_stage: usize,
    pub missing_created_date: usize,
    pub missing_close_date: usize,
    pub warnings: Vec<DataQualityWarning>,
}

impl DataQualitySummary {
    /// Number of distinct records with at least one warning.
    pub fn excluded_records(&self) -> usize {
        self.warnings
            .iter()
            .map(|w| w.opportunity_id.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
