//! Source models.
//!
//! These types describe repositories and their contents as reported by a
//! [`RepositorySource`](crate::RepositorySource), plus the [`FileRecord`]
//! produced for every file that makes it through ingestion.

use std::collections::BTreeMap;
use time::OffsetDateTime;

/// A repository as it appears in a listing.
///
/// Carries enough identity and freshness information to consult a cache
/// without any further round trips to the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    pub name: String,
    /// `owner/name`, unique per source
    pub full_name: String,
    /// Browser URL of the repository
    pub url: String,
    pub private: bool,
    pub description: Option<String>,
    pub created_at: Option<OffsetDateTime>,
    /// Last time anything in the repository changed, according to the source
    pub updated_at: Option<OffsetDateTime>,
}

/// Descriptive metadata for one repository, captured once per crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMetadata {
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub private: bool,
    pub description: Option<String>,
    /// Language name to number of bytes written in that language
    pub languages: BTreeMap<String, u64>,
    pub topics: Vec<String>,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
    pub total_commits: u64,
}
impl From<&RepoHandle> for RepositoryMetadata {
    /// Metadata that can be known from the listing alone; used when the full
    /// metadata lookup fails.
    fn from(repo: &RepoHandle) -> Self {
        Self {
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            url: repo.url.clone(),
            private: repo.private,
            description: repo.description.clone(),
            languages: BTreeMap::new(),
            topics: Vec::new(),
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            total_commits: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Content transfer encoding of an [`Entry`]'s inline content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Base64,
    /// Content is already text (or absent; GitHub reports `"none"` for files
    /// too large to inline).
    Plain,
}
impl From<&str> for Encoding {
    fn from(value: &str) -> Self {
        match value.trim() {
            v if v.eq_ignore_ascii_case("base64") => Self::Base64,
            _ => Self::Plain,
        }
    }
}

/// One item (file or directory) of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    /// Base name
    pub name: String,
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    /// Size in bytes, as reported by the source (zero for directories)
    pub size: u64,
    /// Inline content, if the listing included it
    pub content: Option<String>,
    pub encoding: Option<Encoding>,
}
impl Entry {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self::new(EntryKind::File, path.into(), size)
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self::new(EntryKind::Dir, path.into(), 0)
    }

    fn new(kind: EntryKind, path: String, size: u64) -> Self {
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            kind,
            name,
            path,
            size,
            content: None,
            encoding: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>, encoding: Encoding) -> Self {
        self.content = Some(content.into());
        self.encoding = Some(encoding);
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// A successfully ingested text file.
///
/// `content` is always valid decoded text; binary or undecodable files never
/// produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the repository root
    pub path: String,
    pub content: String,
    /// Detected language name, from the file extension
    pub language: Option<String>,
    /// Full name of the owning repository
    pub repo_name: String,
    pub repo_url: String,
    /// Date of the most recent commit touching this path, if known
    pub last_modified: Option<OffsetDateTime>,
    /// Size in bytes, as reported by the source
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    #[test]
    fn test_metadata_from_handle() {
        let handle = RepoHandle {
            name: "hundred-acre".to_string(),
            full_name: "pooh/hundred-acre".to_string(),
            url: "https://github.com/pooh/hundred-acre".to_string(),
            private: true,
            description: Some("Honey pot tracker".to_string()),
            created_at: None,
            updated_at: Some(datetime!(2024-03-01 12:00 UTC)),
        };
        let metadata = RepositoryMetadata::from(&handle);
        assert_eq!(metadata.full_name, handle.full_name);
        assert_eq!(metadata.updated_at, handle.updated_at);
        assert!(metadata.private);
        assert!(metadata.languages.is_empty());
        assert_eq!(metadata.total_commits, 0);
    }

    #[rstest]
    #[case("base64", Encoding::Base64)]
    #[case("BASE64", Encoding::Base64)]
    #[case("none", Encoding::Plain)]
    #[case("", Encoding::Plain)]
    #[case("utf-8", Encoding::Plain)]
    fn test_encoding_from_str(#[case] raw: &str, #[case] expected: Encoding) {
        assert_eq!(Encoding::from(raw), expected);
    }

    #[rstest]
    #[case("src/lib.rs", "lib.rs")]
    #[case("README.md", "README.md")]
    #[case("a/b/c", "c")]
    #[case("", "")]
    fn test_entry_name_from_path(#[case] path: &str, #[case] name: &str) {
        assert_eq!(Entry::file(path, 0).name, name);
    }
}
