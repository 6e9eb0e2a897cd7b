//! Cache store trait and implementations.

mod json;
#[cfg(feature = "mock")]
mod memory;

pub use self::json::JsonCache;
#[cfg(feature = "mock")]
pub use self::memory::MemoryCache;
use crate::CacheSnapshot;
use crate::error::Result;
use time::OffsetDateTime;
use trawl_source::{FileRecord, RepositoryMetadata};

/// Filesystem-safe key for a repository's full name (`owner/name` becomes
/// `owner_name`).
pub fn cache_key(full_name: &str) -> String {
    full_name.replace(['/', '\\'], "_")
}

/// Persistence for [`CacheSnapshot`]s, keyed by repository full name.
///
/// Injected into the crawler rather than reached for globally, so tests can
/// substitute an in-memory store.
pub trait CacheStore {
    /// Look up a fresh snapshot for `full_name`.
    ///
    /// Returns `None` when there is no snapshot, when it cannot be read or
    /// parsed, or when it is stale relative to `updated_at` (see
    /// [`CacheSnapshot::is_fresh`]). Never fails: a broken cache entry is
    /// logged and treated exactly like a missing one.
    fn load(&self, full_name: &str, updated_at: Option<OffsetDateTime>) -> Option<CacheSnapshot>;

    /// Replace the snapshot for `full_name` with the given metadata and files.
    ///
    /// Implementations must never leave a partially written snapshot visible
    /// to a later [`load`](Self::load).
    fn save(&self, full_name: &str, files: &[FileRecord], metadata: &RepositoryMetadata) -> Result<()>;

    /// Remove the snapshot for one repository, or every snapshot when
    /// `full_name` is `None`. Removing a snapshot that does not exist is not
    /// an error.
    fn clear(&self, full_name: Option<&str>) -> Result<()>;
}

/// Shared freshness gate for [`CacheStore::load`] implementations.
pub(crate) fn fresh_or_log(snapshot: CacheSnapshot, updated_at: Option<OffsetDateTime>) -> Option<CacheSnapshot> {
    if snapshot.is_fresh(updated_at) {
        tracing::info!(repo = snapshot.full_name(), files = snapshot.files.len(), "Loaded snapshot from cache");
        return Some(snapshot);
    }
    tracing::info!(
        repo = snapshot.full_name(),
        cached = ?snapshot.metadata.updated_at,
        source = ?updated_at,
        "Cached snapshot is outdated; re-crawling"
    );
    None
}
