use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to encode chart data: {0}")]
    Json(#[from] serde_json::Error),
}
