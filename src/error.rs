//! Error types for SonarCloud API operations.

use thiserror::Error;

/// Errors that can occur during SonarCloud API operations.
#[derive(Debug, Error)]
pub enum SonarError {
    /// Configuration is missing or incomplete.
    #[error("SonarCloud configuration required: {0}")]
    ConfigMissing(String),

    /// The server reported that the requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The token was rejected or lacks the required permission.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// API request failed.
    #[error("SonarCloud API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// A response is missing a field the client depends on, or it has the wrong type.
    #[error("response violates data contract: field '{field}' is missing or malformed")]
    DataContract { field: String },

    /// The caller supplied a parameter owned by the paginator.
    #[error("parameter '{0}' is reserved for pagination")]
    ReservedParameter(String),

    /// The parameter is not accepted by the endpoint.
    #[error("endpoint {endpoint} does not accept parameter '{param}'")]
    UnknownParameter {
        endpoint: &'static str,
        param: String,
    },

    /// A required parameter was not supplied.
    #[error("endpoint {endpoint} requires parameter '{param}'")]
    MissingParameter {
        endpoint: &'static str,
        param: &'static str,
    },

    /// The server kept reporting more pages past the configured limit.
    #[error("pagination did not converge after {pages} pages")]
    PaginationDidNotConverge { pages: u32 },

    /// Local I/O failure (reading or writing backup files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for SonarCloud operations.
pub type Result<T> = core::result::Result<T, SonarError>;
