use crate::error::ConfigError;
use core_types::{Stage, StageProbabilities};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; missing sections fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataSettings,
    pub forecast: ForecastSettings,
    pub analysis: AnalysisSettings,
    pub report: ReportSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

impl Config {
    /// Checks the cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.forecast.probabilities.to_stage_probabilities()?;
        self.analysis.validate()
    }
}

/// Where the opportunity dataset lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub path: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("opportunities.csv"),
        }
    }
}

/// Which probability mapping drives the weighted forecast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ProbabilitySource {
    /// Use the configured (or command-line) stage probabilities as given.
    #[default]
    Configured,
    /// Replace each stage that has closed-deal history with its historical win rate.
    Historical,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub probability_source: ProbabilitySource,
    pub probabilities: ProbabilitySettings,
}

/// Stage probabilities as fractions in [0, 1].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbabilitySettings {
    pub discovery: Decimal,
    pub demo: Decimal,
    pub proposal: Decimal,
    pub negotiation: Decimal,
}

impl ProbabilitySettings {
    pub fn to_stage_probabilities(&self) -> Result<StageProbabilities, ConfigError> {
        let values = BTreeMap::from([
            (Stage::Discovery, self.discovery),
            (Stage::Demo, self.demo),
            (Stage::Proposal, self.proposal),
            (Stage::Negotiation, self.negotiation),
        ]);
        Ok(StageProbabilities::new(values)?)
    }
}

impl Default for ProbabilitySettings {
    fn default() -> Self {
        let defaults = StageProbabilities::default();
        let value = |stage| defaults.get(stage).unwrap_or(Decimal::ZERO);
        Self {
            discovery: value(Stage::Discovery),
            demo: value(Stage::Demo),
            proposal: value(Stage::Proposal),
            negotiation: value(Stage::Negotiation),
        }
    }
}

/// Tuning knobs consumed by the metrics engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub scenarios: ScenarioSettings,
    pub trends: TrendSettings,
    pub funnel: FunnelSettings,
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let multipliers = [
            ("scenarios.upside_multiplier", self.scenarios.upside_multiplier),
            ("scenarios.downside_multiplier", self.scenarios.downside_multiplier),
            ("scenarios.optimistic_multiplier", self.scenarios.optimistic_multiplier),
            ("scenarios.conservative_multiplier", self.scenarios.conservative_multiplier),
            ("funnel.stuck_multiplier", self.funnel.stuck_multiplier),
        ];
        for (name, value) in multipliers {
            if value <= Decimal::ZERO {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.scenarios.fallback_cycle_days <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "scenarios.fallback_cycle_days must be positive".to_string(),
            ));
        }
        if self.trends.trailing_months == 0 {
            return Err(ConfigError::ValidationError(
                "trends.trailing_months must be at least 1".to_string(),
            ));
        }
        if self.trends.monthly_quota < Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "trends.monthly_quota cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Multipliers for the best/worst case scenarios and the forecast method comparison.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    /// Best case rate = min(1, base rate * upside).
    pub upside_multiplier: Decimal,
    /// Worst case rate = base rate * downside.
    pub downside_multiplier: Decimal,
    pub optimistic_multiplier: Decimal,
    pub conservative_multiplier: Decimal,
    /// Cycle length assumed when no closed deal has both dates.
    pub fallback_cycle_days: Decimal,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            upside_multiplier: dec!(1.30),
            downside_multiplier: dec!(0.70),
            optimistic_multiplier: dec!(1.20),
            conservative_multiplier: dec!(0.80),
            fallback_cycle_days: dec!(100),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    /// Number of most recent months used for trend detection and the flat projection.
    pub trailing_months: usize,
    /// Number of future months the flat projection covers.
    pub projection_months: usize,
    pub monthly_quota: Decimal,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            trailing_months: 3,
            projection_months: 3,
            monthly_quota: dec!(2000000),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FunnelSettings {
    /// A deal counts as stuck when its estimated days in a stage exceed this multiple of the stage average.
    pub stuck_multiplier: Decimal,
}

impl Default for FunnelSettings {
    fn default() -> Self {
        Self {
            stuck_multiplier: dec!(1.5),
        }
    }
}

/// Presentation settings for the console report.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub at_risk_display_limit: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            at_risk_display_limit: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}
