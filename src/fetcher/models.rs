//! Fetch result and error types.

use thiserror::Error;

/// Classification of a failed fetch attempt.
///
/// Every kind is retried within the attempt budget; invalid content is
/// treated the same way as a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Could not connect or the request failed in transit.
    Connection,
    /// Connect or read stall timed out.
    Timeout,
    /// Non-success HTTP status.
    Status(u16),
    /// Body was smaller than the minimum plausible asset size.
    TooSmall(u64),
    /// Failed to read the response body mid-stream.
    Body,
    /// Local file system error while writing the destination.
    Storage,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Connection => "connection",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::Status(_) => "status",
            FetchErrorKind::TooSmall(_) => "too_small",
            FetchErrorKind::Body => "body",
            FetchErrorKind::Storage => "storage",
        }
    }
}

/// Error of a single fetch attempt.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if let Some(status) = err.status() {
            FetchErrorKind::Status(status.as_u16())
        } else if err.is_body() || err.is_decode() {
            FetchErrorKind::Body
        } else {
            FetchErrorKind::Connection
        };
        Self::new(kind, err.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::TimedOut {
            FetchErrorKind::Timeout
        } else {
            FetchErrorKind::Storage
        };
        Self::new(kind, err.to_string())
    }
}

/// Final result of fetching one asset with its whole retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub succeeded: bool,
    pub bytes_written: u64,
    /// Kind of the last failed attempt, if any attempt failed.
    pub last_error: Option<FetchErrorKind>,
    pub attempts: u32,
}

impl FetchOutcome {
    pub fn success(bytes_written: u64, attempts: u32, last_error: Option<FetchErrorKind>) -> Self {
        Self {
            succeeded: true,
            bytes_written,
            last_error,
            attempts,
        }
    }

    pub fn failure(last_error: Option<FetchErrorKind>, attempts: u32) -> Self {
        Self {
            succeeded: false,
            bytes_written: 0,
            last_error,
            attempts,
        }
    }
}
