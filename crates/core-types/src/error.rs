use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Probability for stage {stage} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { stage: String, value: String },
}
