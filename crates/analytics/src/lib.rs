//! # Pipeline Metrics Engine
//!
//! This crate turns a set of sales opportunities into forecasting metrics: the
//! weighted pipeline, historical win rates, cycle and velocity, at-risk deals,
//! the stage funnel, rep, trend and cohort breakdowns, and what-if scenarios.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** No I/O and no clock. The reference date is an argument, so
//!   the same inputs always produce an equal report.
//! - **Stateless Calculation:** `MetricsEngine` holds only its tuning settings.
//!   Each call takes the record set and probabilities by reference and returns a
//!   fresh `MetricsReport`.
//! - **Insufficient data is not an error:** ratios with an empty denominator are
//!   reported as `None`. The only failure is an open deal in a stage without a
//!   probability.
//!
//! ## Public API
//!
//! - `MetricsEngine`: runs every calculation and assembles the report.
//! - `MetricsReport`: the serializable bundle of all metrics.
//! - `OpportunityFilter`: narrows the record set before a run.
//! - `AnalyticsError`: the errors this crate can return.

pub mod at_risk;
pub mod cohorts;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod filter;
pub mod forecast;
pub mod funnel;
pub mod quality;
pub mod report;
pub mod reps;
pub mod scenarios;
pub mod stats;
pub mod trends;
pub mod win_rates;

#[cfg(test)]
mod test_support;

pub use engine::MetricsEngine;
pub use error::AnalyticsError;
pub use filter::OpportunityFilter;
pub use report::*;
