use std::time::Duration;

use thiserror::Error;

/// Failure kinds reported by a snapshot source, classified once at the
/// transport boundary so the retry loop never inspects message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection reset")]
    ConnectionReset,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Client error {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Maximum length for response bodies kept in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl TransportError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: u16, resource: &str, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status {
            404 => TransportError::NotFound(resource.to_string()),
            400..=499 => TransportError::ClientError { status, body: truncated },
            500..=599 => TransportError::ServerError { status, body: truncated },
            _ => TransportError::Malformed(format!("Unexpected status {}: {}", status, truncated)),
        }
    }

    /// Connectivity and server-class failures are worth another attempt;
    /// client-class and malformed responses will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout
                | TransportError::ConnectionReset
                | TransportError::Connection(_)
                | TransportError::ServerError { .. }
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connection(e.to_string())
        } else if e.is_decode() || e.is_body() {
            TransportError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::from_status(status.as_u16(), "", &e.to_string())
        } else if e.is_request() {
            TransportError::Connection(e.to_string())
        } else {
            TransportError::Io(e.to_string())
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout,
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::Interrupted => {
                TransportError::ConnectionReset
            }
            ErrorKind::ConnectionRefused | ErrorKind::NotConnected => {
                TransportError::Connection(e.to_string())
            }
            ErrorKind::InvalidData => TransportError::Malformed(e.to_string()),
            _ => TransportError::Io(e.to_string()),
        }
    }
}

/// A read that could not be completed, naming the resource it was for.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Failed to fetch '{resource}' after {attempts} attempts: {source}")]
    Exhausted {
        resource: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("Failed to fetch '{resource}': {source}")]
    Permanent {
        resource: String,
        #[source]
        source: TransportError,
    },

    #[error("Fetching '{resource}' exceeded its {}ms deadline after {attempts} attempts", .deadline.as_millis())]
    DeadlineExceeded {
        resource: String,
        attempts: u32,
        deadline: Duration,
    },
}

impl FetchError {
    pub fn resource(&self) -> &str {
        match self {
            FetchError::Exhausted { resource, .. }
            | FetchError::Permanent { resource, .. }
            | FetchError::DeadlineExceeded { resource, .. } => resource,
        }
    }

    /// The underlying transport failure, if the loop got as far as one.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            FetchError::Exhausted { source, .. } | FetchError::Permanent { source, .. } => Some(source),
            FetchError::DeadlineExceeded { .. } => None,
        }
    }

    /// Whether asking the user to try again later makes sense.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Permanent { .. })
    }
}
