//! Error types for gateway operations.
//!
//! Every failure that leaves the gateway is a value of [`Error`]. Failures
//! are classified into an [`ErrorCategory`] so callers can decide what to
//! log, what to retry and what to treat as "already exists".

use std::fmt;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of gateway errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The remote system rejected the request (HTTP 4xx).
    Client,
    /// The remote system failed to process the request (HTTP 5xx).
    Server,
    /// The remote endpoint could not be reached at all.
    Connectivity,
    /// The response body was not the structured data we expected.
    Decode,
    /// The gateway itself is misconfigured.
    Config,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Server | Self::Connectivity)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Client => "Request rejected by the remote system",
            Self::Server => "Remote server error",
            Self::Connectivity => "Network connectivity issue",
            Self::Decode => "Invalid response body",
            Self::Config => "Invalid gateway configuration",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Client => "Check the declared fields and the API token permissions",
            Self::Server => "Check the remote system logs and try again",
            Self::Connectivity => "Check that the endpoint is running and reachable",
            Self::Decode => "Check that the endpoint points at the API root",
            Self::Config => "Fix the endpoint URL or token in the configuration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote system answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// The request never produced a response.
    #[error("cannot reach {url}: {message}")]
    Connectivity {
        /// URL that was being requested.
        url: String,
        /// Transport error message.
        message: String,
    },

    /// A success response carried a body we could not decode.
    #[error("invalid response body (HTTP {status}): {message}")]
    Decode {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
        /// Parser error message.
        message: String,
    },

    /// Invalid gateway configuration.
    #[error("invalid gateway configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create a connectivity error.
    pub fn connectivity(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Connectivity {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a decode error.
    pub fn decode(status: u16, body: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            status,
            body: body.into(),
            message: message.to_string(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Status { status, .. } if *status >= 500 => ErrorCategory::Server,
            Error::Status { .. } => ErrorCategory::Client,
            Error::Connectivity { .. } => ErrorCategory::Connectivity,
            Error::Decode { .. } => ErrorCategory::Decode,
            Error::Config(_) => ErrorCategory::Config,
        }
    }

    /// HTTP status code, if a response was received.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } | Error::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body, if a response was received.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::Status { body, .. } | Error::Decode { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether the remote system rejected the request with a 4xx.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Client
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}
