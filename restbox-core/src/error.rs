//! Error types surfaced to callers of a restbox client.

use std::fmt;

use thiserror::Error;

/// Structured description of a failed HTTP exchange.
///
/// Produced by [`normalize`](crate::normalize::normalize) from the body of a
/// response whose status code is 400 or above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    /// Human readable message extracted from the response body.
    pub message: String,
    /// Status code of the response that produced this failure.
    pub status_code: Option<u16>,
    /// Error name or code reported by the server, if any.
    pub name: Option<String>,
    /// Server side stack trace, if the server chose to send one.
    pub stack: Option<String>,
}

impl FailureDetail {
    /// Creates a detail carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            name: None,
            stack: None,
        }
    }

    /// Sets the status code.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.status_code) {
            (Some(name), _) => write!(f, "{name}: {}", self.message),
            (None, Some(status)) => write!(f, "HTTP {status}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Error type for every restbox operation.
///
/// Values are cloneable so that a response carrying an error can be stored
/// in the response cache and replayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestError {
    /// The transport could not complete the exchange (connection refused,
    /// DNS failure, timeout reported by the transport...).
    #[error("transport error: {message}")]
    Transport {
        /// Description reported by the transport.
        message: String,
    },

    /// The server answered with a failure status.
    #[error("{0}")]
    Status(FailureDetail),

    /// A filter failed the exchange explicitly.
    #[error("filter error: {message}")]
    Filter {
        /// Description supplied by the filter.
        message: String,
    },

    /// The HTTP method name is not one of GET, POST, PUT, PATCH or DELETE.
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// A header name or value could not be represented.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl RestError {
    /// Shorthand for [`RestError::Transport`].
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Shorthand for [`RestError::Filter`].
    pub fn filter(message: impl Into<String>) -> Self {
        Self::Filter {
            message: message.into(),
        }
    }

    /// Returns the response status code associated with this error, if known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(detail) => detail.status_code,
            _ => None,
        }
    }

    /// Returns the failure detail of a normalized status error.
    pub fn detail(&self) -> Option<&FailureDetail> {
        match self {
            Self::Status(detail) => Some(detail),
            _ => None,
        }
    }
}

impl From<FailureDetail> for RestError {
    fn from(detail: FailureDetail) -> Self {
        Self::Status(detail)
    }
}

impl From<http::header::InvalidHeaderName> for RestError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for RestError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// Result alias used across the restbox crates.
pub type Result<T> = std::result::Result<T, RestError>;
