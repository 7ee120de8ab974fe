use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to open opportunity file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid opportunity on line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
}
