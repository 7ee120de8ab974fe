use crate::enums::{Stage, Status};
use crate::error::CoreError;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single sales deal, validated at the loader boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub name: String,
    pub amount: Decimal,
    /// Current stage. Only meaningful while the deal is open.
    pub stage: Option<Stage>,
    pub status: Status,
    pub created_date: Option<NaiveDate>,
    /// Actual close date for closed deals, expected close date for open ones.
    pub close_date: Option<NaiveDate>,
    pub owner: String,
    /// Stage a closed deal was in when it was won or lost.
    pub last_stage: Option<Stage>,
}

impl Opportunity {
    pub fn is_open(&self) -> bool {
        self.status == Status::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    /// The stage used for funnel and win-rate bucketing: the current stage for
    /// open deals, `last_stage` for closed ones.
    pub fn funnel_stage(&self) -> Option<Stage> {
        if self.is_open() { self.stage } else { self.last_stage }
    }

    /// Days from creation to close. `None` unless both dates are present.
    pub fn cycle_days(&self) -> Option<i64> {
        match (self.created_date, self.close_date) {
            (Some(created), Some(closed)) => Some((closed - created).num_days()),
            _ => None,
        }
    }

    /// Days between creation and the reference date.
    pub fn age_on(&self, as_of: NaiveDate) -> Option<i64> {
        self.created_date.map(|created| (as_of - created).num_days())
    }
}

/// Per-stage probability that an open deal eventually closes as won.
///
/// Values are validated to lie within [0, 1], including when deserialized.
/// Overrides never mutate a shared value; they return a new mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Stage, Decimal>")]
pub struct StageProbabilities(BTreeMap<Stage, Decimal>);

impl TryFrom<BTreeMap<Stage, Decimal>> for StageProbabilities {
    type Error = CoreError;

    fn try_from(values: BTreeMap<Stage, Decimal>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl StageProbabilities {
    pub fn new(values: BTreeMap<Stage, Decimal>) -> Result<Self, CoreError> {
        for (stage, value) in &values {
            validate_probability(*stage, *value)?;
        }
        Ok(Self(values))
    }

    /// An empty mapping. Any open deal forecast against it is a configuration error.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, stage: Stage) -> Option<Decimal> {
        self.0.get(&stage).copied()
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains_key(&stage)
    }

    /// Returns a copy with `stage` set to `value`.
    pub fn with(&self, stage: Stage, value: Decimal) -> Result<Self, CoreError> {
        validate_probability(stage, value)?;
        let mut values = self.0.clone();
        values.insert(stage, value);
        Ok(Self(values))
    }

    /// Returns a copy where every stage present in `overrides` takes the override's value.
    pub fn overridden_by(&self, overrides: &StageProbabilities) -> Self {
        let mut values = self.0.clone();
        values.extend(overrides.0.iter().map(|(stage, value)| (*stage, *value)));
        Self(values)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, Decimal)> + '_ {
        self.0.iter().map(|(stage, value)| (*stage, *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for StageProbabilities {
    /// Discovery 10%, Demo 30%, Proposal 50%, Negotiation 70%.
    fn default() -> Self {
        Self(BTreeMap::from([
            (Stage::Discovery, dec!(0.10)),
            (Stage::Demo, dec!(0.30)),
            (Stage::Proposal, dec!(0.50)),
            (Stage::Negotiation, dec!(0.70)),
        ]))
    }
}

fn validate_probability(stage: Stage, value: Decimal) -> Result<(), CoreError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(CoreError::ProbabilityOutOfRange {
            stage: stage.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// A calendar month, used as the bucket key for trends and cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Short display label such as `Mar 2024`.
    pub fn label(&self) -> String {
        const NAMES: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        let name = NAMES.get(self.month.saturating_sub(1) as usize).unwrap_or(&"???");
        format!("{} {}", name, self.year)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidInput("month".to_string(), s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
