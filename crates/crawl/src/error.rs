//! Crawl Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! None of these escape [`Crawler`](crate::Crawler): every failure is contained
//! to the file, directory or repository it affects, logged, and skipped.

use derive_more::{Display, Error};

/// A crawl error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for crawl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The repository source failed to answer.
    #[display("repository source error")]
    Source,
    /// File content is not text.
    #[display("file content is not valid base64")]
    InvalidBase64,
    #[display("file content is not valid UTF-8")]
    InvalidUtf8,
    #[display("file content is binary")]
    Binary,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source)
    }
}
