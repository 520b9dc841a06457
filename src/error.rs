//! Custom error types for paperdigest.
//!
//! This module defines all error types used throughout the pipeline.
//! All functions return `Result<T, DigestError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for paperdigest operations.
///
/// Startup errors (`MissingSetting`, `UnsupportedProvider`, `Config`) abort the
/// run; everything else is scoped to a single paper and caught by the batch driver.
#[derive(Debug, Error)]
pub enum DigestError {
    /// A required configuration key is absent
    #[error("Missing configuration key: {0}")]
    MissingSetting(&'static str),

    /// `MODEL_PROVIDER` names a backend this build cannot drive
    #[error("Unsupported model provider: {0}")]
    UnsupportedProvider(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Response body or reason
        message: String,
    },

    /// PDF could not be opened or parsed
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The partitioner could not turn the PDF into elements
    #[error("Partition error: {0}")]
    Partition(String),

    /// The model's answer could not be decoded into the expected shape
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML settings file could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `DigestError`
pub type Result<T> = std::result::Result<T, DigestError>;
