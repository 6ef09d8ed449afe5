use thiserror::Error;

/// All the ways things can go wrong in Nutry
///
/// Scoring itself never fails on well-formed data. What ends up here is
/// malformed input (bad settings, ambiguous events) and collaborator trouble.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Consumption event must reference exactly one of dish or ingredient")]
    AmbiguousConsumptionEvent,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store operation failed: {0}")]
    StoreError(String),

    #[error("Recommendation service is not running")]
    ServiceStopped,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
