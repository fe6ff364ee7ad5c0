use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("No constituents available: {0}")]
    UniverseUnavailable(String),

    #[error("No quotes available: {0}")]
    QuotesUnavailable(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}
