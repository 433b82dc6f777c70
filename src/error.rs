//! Error types for the prospect-audit crate

use thiserror::Error;

/// Result type for audit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for audit operations
///
/// Page-level failures never surface here: the crawler records them on the
/// page and carries on. Only problems that prevent an audit from starting
/// at all are reported as errors.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The URL handed to the auditor could not be used as a crawl root
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error while reading inputs or writing reports
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
