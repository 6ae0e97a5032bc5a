//! Error types for the status API client.

use thiserror::Error;

/// This is an alias for the result type returned by the [`StatusApiClient`](crate::StatusApiClient).
pub type StatusApiResult<T> = Result<T, StatusApiError>;

/// The error type for errors produced by the status API client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusApiError {
    /// Could not reach the API or the connection broke off mid-response, retry might help.
    #[error("could not connect: {0}")]
    Connection(String),

    /// The request timed out, retry might help.
    #[error("request timed out")]
    Timeout,

    /// The API answered with a non-success status.
    ///
    /// Retry might help for `429` and `5xx`, see [`StatusApiError::is_transient`].
    #[error("status API returned {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,

        /// Response body, as far as it could be read.
        body: String,
    },

    /// The response could not be decoded.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// The configured base URL and path do not form a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The HTTP client or request could not be built, unlikely to be recoverable.
    #[error("could not build request: {0}")]
    Build(String),
}

impl StatusApiError {
    /// Returns `true` if the same request may succeed when repeated later.
    pub const fn is_transient(&self) -> bool {
        match self {
            StatusApiError::Connection(_) | StatusApiError::Timeout => true,
            StatusApiError::Status { code, .. } => *code == 429 || *code >= 500,
            StatusApiError::Decode(_)
            | StatusApiError::InvalidUrl(_)
            | StatusApiError::Build(_) => false,
        }
    }

    /// Maps a failure to read a response body. Nothing has been decoded yet at that point, so
    /// the connection is to blame.
    pub(crate) fn body_read(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StatusApiError::Timeout
        } else {
            StatusApiError::Connection(err.to_string())
        }
    }
}

impl From<reqwest::Error> for StatusApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StatusApiError::Timeout
        } else if err.is_connect() || err.is_request() {
            StatusApiError::Connection(err.to_string())
        } else if err.is_status() {
            StatusApiError::Status {
                code: err.status().map(|s| s.as_u16()).unwrap_or_default(),
                body: err.to_string(),
            }
        } else if err.is_body() {
            StatusApiError::Connection(err.to_string())
        } else if err.is_decode() {
            StatusApiError::Decode(err.to_string())
        } else {
            StatusApiError::Build(err.to_string())
        }
    }
}
