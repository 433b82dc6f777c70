//! Error types for the crawler module

use crate::error::Error as CrateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The root URL has no usable host
    #[error("URL has no host: {0}")]
    MissingHost(String),

    /// The root URL uses a scheme the crawler cannot fetch
    #[error("Unsupported scheme '{scheme}' in {url}")]
    UnsupportedScheme {
        /// Offending scheme
        scheme: String,
        /// Full URL as given
        url: String,
    },
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::UrlParse(e) => CrateError::InvalidUrl(e.to_string()),
            CrawlError::MissingHost(_) | CrawlError::UnsupportedScheme { .. } => {
                CrateError::InvalidUrl(err.to_string())
            }
        }
    }
}

/// Why a single page could not be used.
///
/// Failures are recorded on the page and never abort a crawl. Timeouts are
/// kept apart from connectivity errors for reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum FetchFailure {
    /// The request did not complete within the configured timeout
    Timeout,
    /// DNS, connection refused, TLS handshake and similar
    Connect,
    /// The server answered with a non-2xx status
    Status(u16),
    /// The response was not an HTML document
    NotHtml,
    /// The body could not be read or decoded
    Decode,
    /// The redirect chain was too long
    TooManyRedirects,
    /// Anything reqwest reports that fits none of the above
    Other,
}

impl FetchFailure {
    /// Classify a reqwest error into a failure kind
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchFailure::Timeout
        } else if err.is_connect() {
            FetchFailure::Connect
        } else if err.is_redirect() {
            FetchFailure::TooManyRedirects
        } else if err.is_body() || err.is_decode() {
            FetchFailure::Decode
        } else if let Some(status) = err.status() {
            FetchFailure::Status(status.as_u16())
        } else {
            FetchFailure::Other
        }
    }

    /// Whether the failure means the host is unreachable rather than a bad page
    pub fn is_unreachable(&self) -> bool {
        matches!(self, FetchFailure::Timeout | FetchFailure::Connect)
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Timeout => write!(f, "timeout"),
            FetchFailure::Connect => write!(f, "connection error"),
            FetchFailure::Status(code) => write!(f, "HTTP {}", code),
            FetchFailure::NotHtml => write!(f, "not an HTML document"),
            FetchFailure::Decode => write!(f, "undecodable body"),
            FetchFailure::TooManyRedirects => write!(f, "too many redirects"),
            FetchFailure::Other => write!(f, "request failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        assert_eq!(FetchFailure::Status(404).to_string(), "HTTP 404");
        assert_eq!(FetchFailure::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_unreachable() {
        assert!(FetchFailure::Timeout.is_unreachable());
        assert!(FetchFailure::Connect.is_unreachable());
        assert!(!FetchFailure::Status(500).is_unreachable());
        assert!(!FetchFailure::NotHtml.is_unreachable());
    }

    #[test]
    fn test_crawl_error_into_crate_error() {
        let err: CrateError = CrawlError::MissingHost("file:///tmp".to_string()).into();
        assert!(matches!(err, CrateError::InvalidUrl(_)));

        let parse_error = url::Url::parse("http://").unwrap_err();
        let err: CrateError = CrawlError::from(parse_error).into();
        assert!(matches!(err, CrateError::InvalidUrl(_)));
    }

    #[test]
    fn test_failure_serialization() {
        let json = serde_json::to_string(&FetchFailure::Status(503)).unwrap();
        assert_eq!(json, r#"{"kind":"status","status":503}"#);
        let json = serde_json::to_string(&FetchFailure::Timeout).unwrap();
        assert_eq!(json, r#"{"kind":"timeout"}"#);
    }
}
