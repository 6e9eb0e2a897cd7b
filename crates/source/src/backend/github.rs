//! GitHub REST API repository source.
//!
//! Blocking client over `https://api.github.com`. Every method is a single
//! request (or a paginated series for the repository listing), and nothing is
//! retried; callers decide what a failure means.

use crate::RepositorySource;
use crate::error::{ErrorKind, Result};
use crate::models::{Encoding, Entry, EntryKind, RepoHandle, RepositoryMetadata};
use exn::{OptionExt, ResultExt};
use reqwest::blocking::{Client, Response};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Environment variable conventionally holding the API token.
pub const TOKEN_ENV_VAR: &str = "GH_TOKEN";
const DEFAULT_API_ROOT: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;

#[derive(Deserialize)]
struct RepoResponse {
    name: String,
    full_name: String,
    html_url: String,
    private: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    updated_at: Option<OffsetDateTime>,
}
impl From<RepoResponse> for RepoHandle {
    fn from(repo: RepoResponse) -> Self {
        Self {
            name: repo.name,
            full_name: repo.full_name,
            url: repo.html_url,
            private: repo.private,
            description: repo.description,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct TopicsResponse {
    names: Vec<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}
impl From<ContentResponse> for Entry {
    fn from(item: ContentResponse) -> Self {
        Self {
            // Symlinks and submodules are treated as files; reading them
            // fails later and only that one entry is skipped.
            kind: match item.kind.as_str() {
                "dir" => EntryKind::Dir,
                _ => EntryKind::File,
            },
            name: item.name,
            path: item.path,
            size: item.size,
            content: item.content,
            encoding: item.encoding.as_deref().map(Encoding::from),
        }
    }
}

/// The contents endpoint answers with an array for directories and a single
/// object for files.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentResponse>),
    Single(ContentResponse),
}

#[derive(Deserialize)]
struct CommitResponse {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    #[serde(with = "time::serde::rfc3339")]
    date: OffsetDateTime,
}

#[derive(Deserialize)]
struct UserResponse {
    login: String,
}

/// Extract the page number of the `rel="last"` link from a `Link` header.
fn last_page(link: &str) -> Option<u64> {
    link.split(',')
        .find(|part| part.contains(r#"rel="last""#))
        .and_then(|part| part.split(['?', '&', '>']).find_map(|param| param.trim().strip_prefix("page=")))
        .and_then(|page| page.parse().ok())
}

/// GitHub repository source, authenticated with a personal access token.
///
/// # Examples
///
/// ```no_run
/// use trawl_source::RepositorySource;
/// use trawl_source::backend::GitHubSource;
///
/// # fn example() -> trawl_source::error::Result<()> {
/// let source = GitHubSource::new(std::env::var("GH_TOKEN").ok().as_deref())?;
/// for repo in source.list_repositories(false)? {
///     println!("{}", repo.full_name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: Client,
    api_root: Url,
}

impl GitHubSource {
    /// Create a new GitHub source.
    ///
    /// # Errors
    ///
    /// Returns [`MissingCredential`](ErrorKind::MissingCredential) if the
    /// token is absent or blank. This is the only failure that should stop a
    /// crawl before it starts.
    pub fn new(token: Option<&str>) -> Result<Self> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_raise(|| ErrorKind::MissingCredential(TOKEN_ENV_VAR.to_string()))?;
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .or_raise(|| ErrorKind::MissingCredential(TOKEN_ENV_VAR.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        let client = Client::builder()
            .user_agent(concat!("trawl/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .or_raise(|| ErrorKind::Network("failed to build HTTP client".to_string()))?;
        let api_root = Url::parse(DEFAULT_API_ROOT).or_raise(|| ErrorKind::InvalidData("API root"))?;
        Ok(Self { client, api_root })
    }

    /// Point the source at a different API root (GitHub Enterprise).
    pub fn with_api_root(mut self, api_root: &str) -> Result<Self> {
        self.api_root = Url::parse(api_root).or_raise(|| ErrorKind::InvalidData("API root"))?;
        Ok(self)
    }

    /// Login of the authenticated user.
    pub fn username(&self) -> Result<String> {
        let user: UserResponse = self.get_json(self.url(["user"])?, &[])?;
        Ok(user.login)
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|()| exn::Exn::from(ErrorKind::InvalidData("API root cannot be a base")))?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn repo_url<'a>(&self, repo: &'a RepoHandle, rest: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        self.url(["repos"].into_iter().chain(repo.full_name.split('/')).chain(rest))
    }

    fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<Response> {
        let response = self.client.get(url.clone()).query(query).send().or_raise(|| ErrorKind::Network(url.to_string()))?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => exn::bail!(ErrorKind::NotFound(url.to_string())),
            status => exn::bail!(ErrorKind::Status {
                status: status.as_u16(),
                url: url.to_string()
            }),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        self.get(url, query)?.json::<T>().or_raise(|| ErrorKind::InvalidData("JSON body"))
    }

    fn count_commits(&self, repo: &RepoHandle) -> Result<u64> {
        let response = match self.get(self.repo_url(repo, ["commits"])?, &[("per_page", "1")]) {
            // An empty repository has no history to count.
            Err(err) if matches!(&*err, ErrorKind::Status { status: 409, .. }) => return Ok(0),
            result => result?,
        };
        let last = response.headers().get(header::LINK).and_then(|v| v.to_str().ok()).and_then(last_page);
        if let Some(total) = last {
            return Ok(total);
        }
        // No pagination means everything fit on the single page requested.
        let commits: Vec<serde_json::Value> = response.json().or_raise(|| ErrorKind::InvalidData("commit list"))?;
        Ok(commits.len() as u64)
    }
}

impl RepositorySource for GitHubSource {
    fn name(&self) -> &str {
        "github"
    }

    fn list_repositories(&self, include_private: bool) -> Result<Vec<RepoHandle>> {
        let url = self.url(["user", "repos"])?;
        let per_page = PER_PAGE.to_string();
        let mut repos = Vec::new();
        for page in 1_u32.. {
            let batch: Vec<RepoResponse> =
                self.get_json(url.clone(), &[("per_page", per_page.as_str()), ("page", page.to_string().as_str())])?;
            let done = batch.len() < PER_PAGE;
            repos.extend(batch.into_iter().filter(|r| include_private || !r.private).map(RepoHandle::from));
            if done {
                break;
            }
        }
        tracing::debug!(count = repos.len(), include_private, "Listed repositories");
        Ok(repos)
    }

    fn get_metadata(&self, repo: &RepoHandle) -> Result<RepositoryMetadata> {
        let languages: BTreeMap<String, u64> = self.get_json(self.repo_url(repo, ["languages"])?, &[])?;
        let topics: TopicsResponse = self.get_json(self.repo_url(repo, ["topics"])?, &[])?;
        Ok(RepositoryMetadata {
            languages,
            topics: topics.names,
            total_commits: self.count_commits(repo)?,
            ..RepositoryMetadata::from(repo)
        })
    }

    fn list_directory(&self, repo: &RepoHandle, path: &str) -> Result<Vec<Entry>> {
        let url = self.repo_url(repo, ["contents"].into_iter().chain(path.split('/')))?;
        Ok(match self.get_json::<ContentsResponse>(url, &[])? {
            ContentsResponse::Listing(items) => items.into_iter().map(Entry::from).collect(),
            ContentsResponse::Single(item) => vec![Entry::from(item)],
        })
    }

    fn get_file_content(&self, repo: &RepoHandle, path: &str) -> Result<Entry> {
        let url = self.repo_url(repo, ["contents"].into_iter().chain(path.split('/')))?;
        match self.get_json::<ContentsResponse>(url, &[])? {
            ContentsResponse::Single(item) => Ok(Entry::from(item)),
            ContentsResponse::Listing(_) => exn::bail!(ErrorKind::InvalidData("expected a file, found a directory")),
        }
    }

    fn get_last_commit_date(&self, repo: &RepoHandle, path: &str) -> Result<Option<OffsetDateTime>> {
        let commits: Vec<CommitResponse> =
            self.get_json(self.repo_url(repo, ["commits"])?, &[("path", path), ("per_page", "1")])?;
        Ok(commits.into_iter().next().and_then(|c| c.commit.author).map(|a| a.date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    fn handle() -> RepoHandle {
        RepoHandle {
            name: "honey".to_string(),
            full_name: "pooh/honey".to_string(),
            url: "https://github.com/pooh/honey".to_string(),
            private: false,
            description: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn test_new_requires_token(#[case] token: Option<&str>) {
        let err = GitHubSource::new(token).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingCredential(_)));
    }

    #[test]
    fn test_urls() {
        let source = GitHubSource::new(Some("token")).unwrap();
        assert_eq!(source.url(["user", "repos"]).unwrap().as_str(), "https://api.github.com/user/repos");
        let contents = source.repo_url(&handle(), ["contents"].into_iter().chain("src/my file.rs".split('/'))).unwrap();
        assert_eq!(contents.as_str(), "https://api.github.com/repos/pooh/honey/contents/src/my%20file.rs");
        // Root listing has no trailing path segments.
        let root = source.repo_url(&handle(), ["contents"].into_iter().chain("".split('/'))).unwrap();
        assert_eq!(root.as_str(), "https://api.github.com/repos/pooh/honey/contents");
    }

    #[rstest]
    #[case(
        r#"<https://api.github.com/repositories/1/commits?per_page=1&page=2>; rel="next", <https://api.github.com/repositories/1/commits?per_page=1&page=345>; rel="last""#,
        Some(345)
    )]
    #[case(r#"<https://api.github.com/repositories/1/commits?page=7&per_page=1>; rel="last""#, Some(7))]
    #[case(r#"<https://api.github.com/repositories/1/commits?per_page=1&page=1>; rel="prev""#, None)]
    #[case("", None)]
    fn test_last_page(#[case] link: &str, #[case] expected: Option<u64>) {
        assert_eq!(last_page(link), expected);
    }

    #[test]
    fn test_repo_response() {
        let json = r#"{
            "name": "honey",
            "full_name": "pooh/honey",
            "html_url": "https://github.com/pooh/honey",
            "private": true,
            "description": null,
            "created_at": "2020-01-01T00:00:00Z",
            "updated_at": "2024-03-01T12:30:00Z",
            "stargazers_count": 3
        }"#;
        let repo = RepoHandle::from(serde_json::from_str::<RepoResponse>(json).unwrap());
        assert!(repo.private);
        assert_eq!(repo.description, None);
        assert_eq!(repo.updated_at, Some(datetime!(2024-03-01 12:30 UTC)));
    }

    #[test]
    fn test_contents_response() {
        let listing = r#"[
            {"type": "dir", "name": "src", "path": "src", "size": 0},
            {"type": "file", "name": "README.md", "path": "README.md", "size": 12}
        ]"#;
        let ContentsResponse::Listing(items) = serde_json::from_str(listing).unwrap() else {
            panic!("expected a listing");
        };
        let entries: Vec<Entry> = items.into_iter().map(Entry::from).collect();
        assert!(entries[0].is_dir());
        assert_eq!(entries[1].size, 12);
        assert_eq!(entries[1].content, None);

        let file = r#"{"type": "file", "name": "a.py", "path": "src/a.py", "size": 5, "content": "aGVsbG8=\n", "encoding": "base64"}"#;
        let ContentsResponse::Single(item) = serde_json::from_str(file).unwrap() else {
            panic!("expected a single file");
        };
        let entry = Entry::from(item);
        assert_eq!(entry.encoding, Some(Encoding::Base64));
        assert_eq!(entry.content.as_deref(), Some("aGVsbG8=\n"));
    }

    #[test]
    fn test_commit_response_without_author() {
        let json = r#"[{"commit": {"author": null}}]"#;
        let commits: Vec<CommitResponse> = serde_json::from_str(json).unwrap();
        assert!(commits.into_iter().next().and_then(|c| c.commit.author).is_none());
    }
}
