use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Yahoo Finance error: {0}")]
    Yahoo(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Indicator error: {0}")]
    Indicator(String),
}
