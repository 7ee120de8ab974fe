//! # Opportunity Loader
//!
//! Turns the CRM opportunity export (CSV) into validated `Opportunity` records.
//! Loosely typed rows never leave this crate: amounts, dates, statuses and
//! stages are parsed and checked here, so the metrics engine can trust its input.

pub mod csv_source;
pub mod error;

pub use csv_source::{load_opportunities, read_opportunities};
pub use error::LoadError;
