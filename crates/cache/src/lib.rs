//! Snapshot cache for crawled repositories.
//!
//! The cache is not the source of truth - the hosted repositories are. It
//! only exists so that a repository which has not changed since the last
//! crawl does not have to be walked again. If the cache directory is deleted,
//! the next crawl simply rebuilds it.
//!
//! # Architecture
//! Each repository is stored as one [`CacheSnapshot`]: its metadata plus the
//! ordered list of ingested files. Snapshots are replaced wholesale, never
//! merged. A snapshot is only handed back if it is at least as new as the
//! source's `updated_at`; anything stale, missing or unreadable is reported
//! as a miss, never as an error.

pub mod error;
mod snapshot;
mod store;

pub use crate::snapshot::CacheSnapshot;
#[cfg(feature = "mock")]
pub use crate::store::MemoryCache;
pub use crate::store::{CacheStore, JsonCache, cache_key};
use std::sync::Arc;

pub type CacheHandle = Arc<dyn CacheStore + Send + Sync>;
