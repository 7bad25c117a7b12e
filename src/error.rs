//! Error types for the enroll_forecast crate

use thiserror::Error;

/// Custom error types for the enroll_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    Data(String),

    /// A model could not be fitted to a series
    #[error("Fit error: {0}")]
    Fit(String),

    /// An upstream provider failed to supply its snapshot
    #[error("Provider error: {0}")]
    Provider(String),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
