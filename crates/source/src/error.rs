//! Source Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A source error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No credential was supplied to an authenticated source.
    #[display("missing credential: {_0}")]
    MissingCredential(#[error(not(source))] String),
    /// Repository or path does not exist (or is not visible to the caller)
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Connection-level failure talking to the remote API
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The remote API answered with an unexpected status code
    #[display("unexpected status {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The URL that was requested.
        url: String,
    },
    /// The remote API answered, but the body could not be understood
    #[display("invalid response data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
