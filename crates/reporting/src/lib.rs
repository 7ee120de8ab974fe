//! # Pipeline Reporting
//!
//! Presentation of a `MetricsReport`: console tables, standalone Plotly chart
//! pages and the forecast CSV export. Nothing here computes metrics; every
//! number comes from the report as given.

pub mod charts;
pub mod console;
pub mod error;
pub mod export;
pub mod format;

pub use charts::Chart;
pub use error::ReportingError;
