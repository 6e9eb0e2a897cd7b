//! In-memory repository source for testing.

use crate::RepositorySource;
use crate::error::{ErrorKind, Result};
use crate::models::{Encoding, Entry, RepoHandle, RepositoryMetadata};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use time::OffsetDateTime;

/// One repository served by a [`MockSource`].
///
/// Files are given as `(path, bytes)`; directories are implied by the paths.
/// Any path (file or directory) can be made to fail on listing or reading to
/// exercise error containment.
#[derive(Debug, Clone)]
pub struct MockRepository {
    handle: RepoHandle,
    metadata: Option<RepositoryMetadata>,
    files: BTreeMap<String, Vec<u8>>,
    sizes: HashMap<String, u64>,
    commit_dates: HashMap<String, OffsetDateTime>,
    failing_dirs: HashSet<String>,
    failing_files: HashSet<String>,
    failing_commits: bool,
    inline_content: bool,
}

impl MockRepository {
    /// Create a public repository `owner/name` with no files.
    pub fn new(full_name: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let name = full_name.rsplit('/').next().unwrap_or_default().to_string();
        let handle = RepoHandle {
            name,
            url: format!("https://github.com/{full_name}"),
            full_name,
            private: false,
            description: None,
            created_at: None,
            updated_at: None,
        };
        Self {
            metadata: None,
            handle,
            files: BTreeMap::new(),
            sizes: HashMap::new(),
            commit_dates: HashMap::new(),
            failing_dirs: HashSet::new(),
            failing_files: HashSet::new(),
            failing_commits: false,
            inline_content: true,
        }
    }

    pub fn private(mut self) -> Self {
        self.handle.private = true;
        self
    }

    pub fn updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.handle.updated_at = Some(updated_at);
        self
    }

    /// Override the metadata returned by [`RepositorySource::get_metadata`].
    pub fn with_metadata(mut self, metadata: RepositoryMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), data.into());
        self
    }

    /// Add a file whose reported size differs from its actual content length.
    pub fn with_sized_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>, size: u64) -> Self {
        let path = path.into();
        self.sizes.insert(path.clone(), size);
        self.with_file(path, data)
    }

    pub fn with_commit_date(mut self, path: impl Into<String>, date: OffsetDateTime) -> Self {
        self.commit_dates.insert(path.into(), date);
        self
    }

    /// Listing this directory (use `""` for the root) fails.
    pub fn failing_dir(mut self, path: impl Into<String>) -> Self {
        self.failing_dirs.insert(path.into());
        self
    }

    /// Reading this file's content fails. Implies content is not inlined.
    pub fn failing_file(mut self, path: impl Into<String>) -> Self {
        self.failing_files.insert(path.into());
        self
    }

    /// Every last-commit lookup fails.
    pub fn failing_commits(mut self) -> Self {
        self.failing_commits = true;
        self
    }

    /// Leave content out of directory listings, forcing a per-file fetch.
    pub fn without_inline_content(mut self) -> Self {
        self.inline_content = false;
        self
    }

    pub fn handle(&self) -> &RepoHandle {
        &self.handle
    }

    fn file_entry(&self, path: &str, data: &[u8], inline: bool) -> Entry {
        let size = self.sizes.get(path).copied().unwrap_or(data.len() as u64);
        let entry = Entry::file(path, size);
        match inline && !self.failing_files.contains(path) {
            true => entry.with_content(encode_base64(data), Encoding::Base64),
            false => entry,
        }
    }

    fn list(&self, dir: &str) -> Result<Vec<Entry>> {
        if self.failing_dirs.contains(dir) {
            exn::bail!(ErrorKind::Network(format!("listing {dir:?} failed")));
        }
        let prefix = match dir {
            "" => String::new(),
            d => format!("{d}/"),
        };
        let mut subdirs = BTreeSet::new();
        let mut entries = Vec::new();
        for (path, data) in &self.files {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) => {
                    subdirs.insert(format!("{prefix}{child}"));
                },
                None => entries.push(self.file_entry(path, data, self.inline_content)),
            }
        }
        if entries.is_empty() && subdirs.is_empty() {
            exn::bail!(ErrorKind::NotFound(format!("{}:{dir}", self.handle.full_name)));
        }
        let mut listing: Vec<Entry> = subdirs.into_iter().map(Entry::dir).collect();
        listing.extend(entries);
        Ok(listing)
    }
}

/// In-memory repository source for testing.
///
/// Repositories are served in insertion order. Every call is recorded so
/// tests can assert on how much traffic a crawl generated.
#[derive(Debug, Default)]
pub struct MockSource {
    repositories: Vec<MockRepository>,
    failing_listing: bool,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new(repositories: impl IntoIterator<Item = MockRepository>) -> Self {
        Self {
            repositories: repositories.into_iter().collect(),
            failing_listing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make [`RepositorySource::list_repositories`] fail.
    pub fn failing_listing(mut self) -> Self {
        self.failing_listing = true;
        self
    }

    /// Every call made so far, formatted as `method:full_name[:path]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Number of calls made so far whose description starts with `prefix`.
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn repository(&self, repo: &RepoHandle) -> Result<&MockRepository> {
        self.repositories
            .iter()
            .find(|r| r.handle.full_name == repo.full_name)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(repo.full_name.clone())))
    }
}

impl RepositorySource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_repositories(&self, include_private: bool) -> Result<Vec<RepoHandle>> {
        self.record("list_repositories".to_string());
        if self.failing_listing {
            exn::bail!(ErrorKind::Network("listing repositories failed".to_string()));
        }
        Ok(self
            .repositories
            .iter()
            .filter(|r| include_private || !r.handle.private)
            .map(|r| r.handle.clone())
            .collect())
    }

    fn get_metadata(&self, repo: &RepoHandle) -> Result<RepositoryMetadata> {
        self.record(format!("get_metadata:{}", repo.full_name));
        let mock = self.repository(repo)?;
        Ok(mock.metadata.clone().unwrap_or_else(|| RepositoryMetadata::from(&mock.handle)))
    }

    fn list_directory(&self, repo: &RepoHandle, path: &str) -> Result<Vec<Entry>> {
        self.record(format!("list_directory:{}:{path}", repo.full_name));
        self.repository(repo)?.list(path)
    }

    fn get_file_content(&self, repo: &RepoHandle, path: &str) -> Result<Entry> {
        self.record(format!("get_file_content:{}:{path}", repo.full_name));
        let mock = self.repository(repo)?;
        if mock.failing_files.contains(path) {
            exn::bail!(ErrorKind::Network(format!("reading {path:?} failed")));
        }
        let data = mock
            .files
            .get(path)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(format!("{}:{path}", repo.full_name))))?;
        Ok(mock.file_entry(path, data, true))
    }

    fn get_last_commit_date(&self, repo: &RepoHandle, path: &str) -> Result<Option<OffsetDateTime>> {
        self.record(format!("get_last_commit_date:{}:{path}", repo.full_name));
        let mock = self.repository(repo)?;
        if mock.failing_commits {
            exn::bail!(ErrorKind::Network("commit history unavailable".to_string()));
        }
        Ok(mock.commit_dates.get(path).copied())
    }
}

/// Encode the way the GitHub contents API does: standard alphabet, padded,
/// wrapped at 60 characters.
fn encode_base64(data: &[u8]) -> String {
    let encoded = BASE64.encode(data);
    let lines: Vec<&str> = encoded
        .as_bytes()
        .chunks(60)
        // Safety: base64 output is always ASCII.
        .map(|line| std::str::from_utf8(line).unwrap_or_default())
        .collect();
    lines.join("\n")
}
