use crate::classify::{is_ignored_dir, language_for, should_process};
use crate::decode::decode;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::VecDeque;
use tracing::instrument;
use trawl_cache::CacheHandle;
use trawl_source::{Encoding, Entry, EntryKind, FileRecord, RepoHandle, RepositoryMetadata, SourceHandle};

/// Files reported larger than this many bytes are skipped.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Walks repositories from a [`RepositorySource`](trawl_source::RepositorySource)
/// and turns their eligible text files into [`FileRecord`]s.
///
/// With a cache attached, a repository whose snapshot is still fresh is
/// served from the cache without a single call to the source; every
/// successful walk replaces the snapshot.
///
/// No failure inside a crawl is returned to the caller. A file that cannot be
/// read is skipped, a directory that cannot be listed is skipped with its
/// whole subtree, and a repository that cannot be listed yields no files.
pub struct Crawler {
    source: SourceHandle,
    cache: Option<CacheHandle>,
    max_file_size: u64,
    processed: Vec<RepositoryMetadata>,
    files: Vec<FileRecord>,
}

impl Crawler {
    /// A crawler without a cache; every crawl walks the full tree.
    pub fn new(source: SourceHandle) -> Self {
        Self {
            source,
            cache: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            processed: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn with_cache(mut self, cache: CacheHandle) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Metadata of every repository crawled by this instance, in crawl order.
    pub fn processed_repositories(&self) -> &[RepositoryMetadata] {
        &self.processed
    }

    /// Every file produced by this instance, in crawl order.
    pub fn all_files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Crawl one repository, from the cache when possible.
    #[instrument(skip_all, fields(repo = %repo.full_name))]
    pub fn crawl_repository(&mut self, repo: &RepoHandle) -> Vec<FileRecord> {
        if let Some(cache) = &self.cache
            && let Some(snapshot) = cache.load(&repo.full_name, repo.updated_at)
        {
            self.processed.push(snapshot.metadata);
            self.files.extend(snapshot.files.iter().cloned());
            return snapshot.files;
        }

        let metadata = self.source.get_metadata(repo).unwrap_or_else(|err| {
            tracing::warn!(error = ?err, "Could not fetch repository metadata; using listing details");
            RepositoryMetadata::from(repo)
        });
        self.processed.push(metadata.clone());

        tracing::info!(source = self.source.name(), "Crawling repository");
        let files = match self.walk(repo) {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(error = ?err, "Cannot access repository contents");
                return Vec::new();
            },
        };
        self.files.extend(files.iter().cloned());
        tracing::info!(files = files.len(), "Crawled repository");

        if let Some(cache) = &self.cache
            && let Err(err) = cache.save(&repo.full_name, &files, &metadata)
        {
            tracing::warn!(error = ?err, "Could not save snapshot to cache");
        }
        files
    }

    /// Crawl every repository the source lists, in listing order.
    ///
    /// `max_repos` keeps only the first `n` repositories; `None` or zero means
    /// no limit. Returns the files and metadata of this call only.
    #[instrument(skip(self))]
    pub fn crawl_all(
        &mut self,
        include_private: bool,
        max_repos: Option<usize>,
    ) -> (Vec<FileRecord>, Vec<RepositoryMetadata>) {
        let mut repos = match self.source.list_repositories(include_private) {
            Ok(repos) => repos,
            Err(err) => {
                tracing::error!(source = self.source.name(), error = ?err, "Could not list repositories");
                return (Vec::new(), Vec::new());
            },
        };
        if let Some(max_repos) = max_repos.filter(|&n| n > 0) {
            repos.truncate(max_repos);
        }

        let first = self.processed.len();
        let mut files = Vec::new();
        for repo in &repos {
            files.extend(self.crawl_repository(repo));
        }
        let metadata = self.processed[first..].to_vec();
        tracing::info!(repositories = metadata.len(), files = files.len(), "Crawled all repositories");
        (files, metadata)
    }

    /// Breadth-first walk from the root. Only a failed root listing is
    /// returned as an error.
    fn walk(&self, repo: &RepoHandle) -> Result<Vec<FileRecord>> {
        let root = self.source.list_directory(repo, "").or_raise(|| ErrorKind::Source)?;
        let mut pending: VecDeque<Entry> = root.into();
        let mut files = Vec::new();
        while let Some(entry) = pending.pop_front() {
            match entry.kind {
                EntryKind::Dir => {
                    if is_ignored_dir(&entry.name) {
                        continue;
                    }
                    match self.source.list_directory(repo, &entry.path) {
                        Ok(children) => pending.extend(children),
                        Err(err) => tracing::debug!(path = %entry.path, error = ?err, "Skipping unlistable directory"),
                    }
                },
                EntryKind::File => {
                    if !should_process(&entry.path) {
                        continue;
                    }
                    if entry.size > self.max_file_size {
                        tracing::debug!(path = %entry.path, size = entry.size, "Skipping large file");
                        continue;
                    }
                    let path = entry.path.clone();
                    match self.extract(repo, entry) {
                        Ok(Some(file)) => {
                            tracing::debug!(path = %path, "Processed file");
                            files.push(file);
                        },
                        Ok(None) => (),
                        Err(err) => tracing::warn!(path = %path, error = ?err, "Error processing file"),
                    }
                },
            }
        }
        Ok(files)
    }

    /// Build the record for one eligible file. `Ok(None)` means the file is
    /// not text (or is blank) and is skipped without complaint.
    fn extract(&self, repo: &RepoHandle, entry: Entry) -> Result<Option<FileRecord>> {
        let Entry { path, size, content, encoding, .. } = entry;
        let (content, encoding) = match content {
            Some(content) => (content, encoding),
            None => {
                let fetched = self.source.get_file_content(repo, &path).or_raise(|| ErrorKind::Source)?;
                (fetched.content.unwrap_or_default(), fetched.encoding)
            },
        };
        let content = match decode(&content, encoding.unwrap_or(Encoding::Plain)) {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(None),
            Err(err) => {
                tracing::debug!(path = %path, reason = %*err, "Skipping non-text file");
                return Ok(None);
            },
        };
        // Best effort: a file without a known commit date is still ingested.
        let last_modified = self.source.get_last_commit_date(repo, &path).ok().flatten();
        Ok(Some(FileRecord {
            language: language_for(&path).map(str::to_string),
            path,
            content,
            repo_name: repo.full_name.clone(),
            repo_url: repo.url.clone(),
            last_modified,
            size,
        }))
    }
}
