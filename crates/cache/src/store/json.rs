//! JSON file cache store.
//!
//! One `<owner>_<name>.json` file per repository inside a cache directory.
//! Writes go to a temporary file in the same directory which is then renamed
//! over the old snapshot, so readers only ever see a complete file.

use super::{CacheStore, cache_key, fresh_or_log};
use crate::CacheSnapshot;
use crate::error::{ErrorKind, Result};
use crate::snapshot::SnapshotRow;
use exn::ResultExt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use tracing::instrument;
use trawl_source::{FileRecord, RepositoryMetadata};

const EXTENSION: &str = "json";

/// Filesystem-backed [`CacheStore`].
///
/// # Examples
///
/// ```no_run
/// use trawl_cache::{CacheStore, JsonCache};
///
/// # fn example() -> trawl_cache::error::Result<()> {
/// let cache = JsonCache::new(".cache/repos")?;
/// cache.clear(Some("pooh/honey"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonCache {
    root: PathBuf,
}

impl JsonCache {
    /// Open (creating if necessary) a cache rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).or_raise(|| ErrorKind::Io(root.clone()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the snapshot file for `full_name`.
    pub fn path_for(&self, full_name: &str) -> PathBuf {
        self.root.join(format!("{}.{EXTENSION}", cache_key(full_name)))
    }

    /// Read and parse a snapshot, distinguishing "absent" from "broken".
    fn read(&self, full_name: &str) -> Result<Option<CacheSnapshot>> {
        let path = self.path_for(full_name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).or_raise(|| ErrorKind::Io(path)),
        };
        let row: SnapshotRow = serde_json::from_slice(&bytes).or_raise(|| ErrorKind::InvalidData("snapshot JSON"))?;
        Ok(Some(CacheSnapshot::try_from(row)?))
    }

    fn remove(path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).or_raise(|| ErrorKind::Io(path.to_path_buf())),
        }
    }
}

impl CacheStore for JsonCache {
    fn load(&self, full_name: &str, updated_at: Option<OffsetDateTime>) -> Option<CacheSnapshot> {
        match self.read(full_name) {
            // Distinct names can share a key (`a/b_c` and `a_b/c`).
            Ok(Some(snapshot)) if snapshot.full_name() != full_name => {
                tracing::warn!(repo = full_name, cached = snapshot.full_name(), "Cache entry belongs to another repository");
                None
            },
            Ok(Some(snapshot)) => fresh_or_log(snapshot, updated_at),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(repo = full_name, error = ?err, "Invalid cache entry; treating as a miss");
                None
            },
        }
    }

    #[instrument(skip(self, files, metadata), fields(files = files.len()))]
    fn save(&self, full_name: &str, files: &[FileRecord], metadata: &RepositoryMetadata) -> Result<()> {
        let path = self.path_for(full_name);
        let row = SnapshotRow::new(metadata, files)?;
        let json = serde_json::to_vec(&row).or_raise(|| ErrorKind::InvalidData("snapshot JSON"))?;
        let mut temp = NamedTempFile::new_in(&self.root).or_raise(|| ErrorKind::Io(self.root.clone()))?;
        temp.write_all(&json).or_raise(|| ErrorKind::Io(temp.path().to_path_buf()))?;
        temp.as_file().sync_all().or_raise(|| ErrorKind::Io(temp.path().to_path_buf()))?;
        temp.persist(&path).or_raise(|| ErrorKind::Io(path.clone()))?;
        tracing::debug!(repo = full_name, path = %path.display(), "Saved snapshot to cache");
        Ok(())
    }

    fn clear(&self, full_name: Option<&str>) -> Result<()> {
        if let Some(full_name) = full_name {
            if Self::remove(&self.path_for(full_name))? {
                tracing::info!(repo = full_name, "Cleared cache");
            }
            return Ok(());
        }
        let entries = fs::read_dir(&self.root).or_raise(|| ErrorKind::Io(self.root.clone()))?;
        let mut cleared = 0_usize;
        for entry in entries {
            let path = entry.or_raise(|| ErrorKind::Io(self.root.clone()))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == EXTENSION) && Self::remove(&path)? {
                cleared += 1;
            }
        }
        tracing::info!(cleared, "Cleared all cache");
        Ok(())
    }
}
