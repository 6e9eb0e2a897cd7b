//! Repository source trait and implementations.
//!
//! This module defines the `RepositorySource` trait, which provides a unified
//! interface over a hosted version-control API (GitHub, or an in-memory fake
//! in tests).

#[cfg(feature = "github")]
mod github;
#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "github")]
pub use self::github::GitHubSource;
#[cfg(feature = "mock")]
pub use self::mock::{MockRepository, MockSource};
use crate::error::Result;
use crate::models::{Entry, RepoHandle, RepositoryMetadata};
use time::OffsetDateTime;

/// Unified interface for repository sources.
///
/// Every method is a blocking round trip with no retries. Callers decide how
/// far a failure is allowed to spread; the crawler contains each one to the
/// smallest unit of work it affects.
///
/// # Paths
/// Paths are relative to the repository root and `/`-separated. The empty
/// string denotes the root directory.
///
/// # Examples
///
/// ```
/// use trawl_source::{RepoHandle, RepositorySource, error::Result};
///
/// fn count_root_entries(source: &dyn RepositorySource, repo: &RepoHandle) -> Result<usize> {
///     Ok(source.list_directory(repo, "")?.len())
/// }
/// ```
pub trait RepositorySource: Send + Sync {
    /// Name of the source, used for logging only.
    fn name(&self) -> &str;

    /// List the authenticated user's repositories.
    ///
    /// Private repositories are left out unless `include_private` is set.
    fn list_repositories(&self, include_private: bool) -> Result<Vec<RepoHandle>>;

    /// Fetch full metadata (languages, topics, commit count) for a repository.
    fn get_metadata(&self, repo: &RepoHandle) -> Result<RepositoryMetadata>;

    /// List the entries of one directory.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) for a
    /// directory (or repository) that cannot be listed, including an empty
    /// repository's root.
    fn list_directory(&self, repo: &RepoHandle, path: &str) -> Result<Vec<Entry>>;

    /// Fetch a single file, with its content populated.
    fn get_file_content(&self, repo: &RepoHandle, path: &str) -> Result<Entry>;

    /// Date of the most recent commit touching `path`, if there is one.
    fn get_last_commit_date(&self, repo: &RepoHandle, path: &str) -> Result<Option<OffsetDateTime>>;
}
