use core_types::{CoreError, Stage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// An open deal sits in a stage the probability mapping does not cover.
    #[error("Configuration error: no probability configured for stage '{0}'")]
    MissingProbability(Stage),

    #[error("Invalid probability mapping: {0}")]
    InvalidProbability(#[from] CoreError),
}
