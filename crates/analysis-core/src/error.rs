use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),
}
