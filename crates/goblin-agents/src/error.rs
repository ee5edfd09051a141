use thiserror::Error;

use crate::validator::ValidationError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model response parse error: {0}")]
    Parse(String),

    #[error("Invalid decision: {0}")]
    Validation(#[from] ValidationError),

    /// A stage precondition did not hold; the message is reported as-is.
    #[error("{0}")]
    Precondition(String),

    #[error("Model call timed out after {0} seconds")]
    Timeout(u64),

    #[error("Data error: {0}")]
    Data(#[from] goblin_data::DataError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stage {stage} panicked: {reason}")]
    StagePanicked { stage: String, reason: String },
}
