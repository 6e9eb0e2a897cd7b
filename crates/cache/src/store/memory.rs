use super::{CacheStore, fresh_or_log};
use crate::CacheSnapshot;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;
use trawl_source::{FileRecord, RepositoryMetadata};

/// In-memory [`CacheStore`] for tests. Applies the same freshness rule as
/// [`JsonCache`](super::JsonCache) and counts writes.
#[derive(Debug, Default)]
pub struct MemoryCache {
    snapshots: Mutex<HashMap<String, CacheSnapshot>>,
    saves: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a snapshot directly, bypassing the save counter.
    pub fn insert(&self, snapshot: CacheSnapshot) {
        self.lock().insert(snapshot.full_name().to_string(), snapshot);
    }

    /// Stored snapshot for `full_name`, regardless of freshness.
    pub fn get(&self, full_name: &str) -> Option<CacheSnapshot> {
        self.lock().get(full_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of successful [`CacheStore::save`] calls.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheSnapshot>> {
        self.snapshots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheStore for MemoryCache {
    fn load(&self, full_name: &str, updated_at: Option<OffsetDateTime>) -> Option<CacheSnapshot> {
        fresh_or_log(self.get(full_name)?, updated_at)
    }

    fn save(&self, full_name: &str, files: &[FileRecord], metadata: &RepositoryMetadata) -> Result<()> {
        let snapshot = CacheSnapshot::new(metadata.clone(), files.to_vec());
        self.lock().insert(full_name.to_string(), snapshot);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self, full_name: Option<&str>) -> Result<()> {
        match full_name {
            Some(full_name) => {
                self.lock().remove(full_name);
            },
            None => self.lock().clear(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::{files, metadata};
    use time::macros::datetime;

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        let updated = datetime!(2024-03-01 12:00 UTC);
        assert!(cache.load("pooh/honey", Some(updated)).is_none());
        cache.save("pooh/honey", &files(), &metadata(Some(updated))).unwrap();
        assert_eq!(cache.saves(), 1);
        assert_eq!(cache.load("pooh/honey", Some(updated)).unwrap().files, files());
        assert!(cache.load("pooh/honey", Some(datetime!(2024-03-02 00:00 UTC))).is_none());
        // Stale entries are kept, just not served.
        assert_eq!(cache.len(), 1);
        cache.clear(Some("pooh/honey")).unwrap();
        assert!(cache.is_empty());
    }
}
