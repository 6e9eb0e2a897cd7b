use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use trawl_source::{FileRecord, RepositoryMetadata};

/// One repository's metadata and its ingested files, as cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub metadata: RepositoryMetadata,
    pub files: Vec<FileRecord>,
}
impl CacheSnapshot {
    pub fn new(metadata: RepositoryMetadata, files: Vec<FileRecord>) -> Self {
        Self { metadata, files }
    }

    /// Full name of the repository this snapshot belongs to.
    pub fn full_name(&self) -> &str {
        &self.metadata.full_name
    }

    /// Whether this snapshot may be reused, given the source's current
    /// `updated_at`.
    ///
    /// Only a snapshot whose stored timestamp is at least as recent as the
    /// source's is fresh. When either timestamp is unknown, freshness cannot
    /// be established and the repository must be crawled again.
    pub fn is_fresh(&self, source_updated_at: Option<OffsetDateTime>) -> bool {
        match (self.metadata.updated_at, source_updated_at) {
            (Some(cached), Some(source)) => cached >= source,
            _ => false,
        }
    }
}

fn format_timestamp(value: Option<OffsetDateTime>, field: &'static str) -> Result<Option<String>, Error> {
    value.map(|v| v.format(&Rfc3339).or_raise(|| ErrorKind::InvalidData(field))).transpose()
}

fn parse_timestamp(value: Option<&str>, field: &'static str) -> Result<Option<OffsetDateTime>, Error> {
    value.map(|v| OffsetDateTime::parse(v, &Rfc3339).or_raise(|| ErrorKind::InvalidData(field))).transpose()
}

/// On-disk layout of a snapshot. Field names are part of the persisted
/// format; renaming one invalidates every existing cache file.
///
/// Nullable fields must still be present: a missing key means the file is
/// damaged, not that the value is unknown.
#[derive(Serialize, Deserialize)]
pub(crate) struct SnapshotRow {
    metadata: MetadataRow,
    files: Vec<FileRow>,
}

#[derive(Serialize, Deserialize)]
struct MetadataRow {
    name: String,
    full_name: String,
    url: String,
    private: bool,
    #[serde(deserialize_with = "Option::deserialize")]
    description: Option<String>,
    languages: BTreeMap<String, u64>,
    topics: Vec<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    created_at: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    updated_at: Option<String>,
    total_commits: u64,
}

#[derive(Serialize, Deserialize)]
struct FileRow {
    path: String,
    content: String,
    #[serde(deserialize_with = "Option::deserialize")]
    language: Option<String>,
    repo_name: String,
    repo_url: String,
    #[serde(deserialize_with = "Option::deserialize")]
    last_modified: Option<String>,
    size: u64,
}

impl SnapshotRow {
    pub(crate) fn new(metadata: &RepositoryMetadata, files: &[FileRecord]) -> Result<Self, Error> {
        Ok(Self {
            metadata: MetadataRow::try_from(metadata)?,
            files: files.iter().map(FileRow::try_from).collect::<Result<Vec<_>, _>>()?,
        })
    }
}
impl TryFrom<SnapshotRow> for CacheSnapshot {
    type Error = Error;
    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            metadata: RepositoryMetadata::try_from(row.metadata)?,
            files: row.files.into_iter().map(FileRecord::try_from).collect::<Result<Vec<_>, _>>()?,
        })
    }
}

impl TryFrom<&RepositoryMetadata> for MetadataRow {
    type Error = Error;
    fn try_from(metadata: &RepositoryMetadata) -> Result<Self, Self::Error> {
        Ok(Self {
            name: metadata.name.clone(),
            full_name: metadata.full_name.clone(),
            url: metadata.url.clone(),
            private: metadata.private,
            description: metadata.description.clone(),
            languages: metadata.languages.clone(),
            topics: metadata.topics.clone(),
            created_at: format_timestamp(metadata.created_at, "created_at")?,
            updated_at: format_timestamp(metadata.updated_at, "updated_at")?,
            total_commits: metadata.total_commits,
        })
    }
}
impl TryFrom<MetadataRow> for RepositoryMetadata {
    type Error = Error;
    fn try_from(row: MetadataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            created_at: parse_timestamp(row.created_at.as_deref(), "created_at")?,
            updated_at: parse_timestamp(row.updated_at.as_deref(), "updated_at")?,
            name: row.name,
            full_name: row.full_name,
            url: row.url,
            private: row.private,
            description: row.description,
            languages: row.languages,
            topics: row.topics,
            total_commits: row.total_commits,
        })
    }
}

impl TryFrom<&FileRecord> for FileRow {
    type Error = Error;
    fn try_from(file: &FileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            path: file.path.clone(),
            content: file.content.clone(),
            language: file.language.clone(),
            repo_name: file.repo_name.clone(),
            repo_url: file.repo_url.clone(),
            last_modified: format_timestamp(file.last_modified, "last_modified")?,
            size: file.size,
        })
    }
}
impl TryFrom<FileRow> for FileRecord {
    type Error = Error;
    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            last_modified: parse_timestamp(row.last_modified.as_deref(), "last_modified")?,
            path: row.path,
            content: row.content,
            language: row.language,
            repo_name: row.repo_name,
            repo_url: row.repo_url,
            size: row.size,
        })
    }
}
