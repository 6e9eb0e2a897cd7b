//! Configuration for trawl.
//!
//! Values are merged from several layers, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. `config.toml` in the platform configuration directory,
//! 3. an explicitly given configuration file,
//! 4. `TRAWL_`-prefixed environment variables (`TRAWL_MAX_REPOS=5`),
//! 5. `GH_TOKEN`, which always wins for the API token.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Environment variable holding the GitHub API token.
pub const TOKEN_ENV_VAR: &str = "GH_TOKEN";
const ENV_PREFIX: &str = "TRAWL_";
const CONFIG_FILE: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "trawl")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub API token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Directory holding one snapshot file per repository
    pub cache_dir: PathBuf,
    pub use_cache: bool,
    pub include_private: bool,
    /// Crawl at most this many repositories (in listing order)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_repos: Option<usize>,
    /// Files reported larger than this many bytes are skipped
    pub max_file_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            cache_dir: project_dirs()
                .map(|dirs| dirs.cache_dir().join("repos"))
                .unwrap_or_else(|| PathBuf::from(".cache/repos")),
            use_cache: true,
            include_private: true,
            max_repos: None,
            max_file_size: trawl_crawl::DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Config {
    /// Load and validate configuration from every layer.
    ///
    /// `explicit` must exist if given; the platform configuration file is
    /// optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user = project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE));
        Self::load_from(user.as_deref(), explicit)
    }

    #[instrument]
    fn load_from(user: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(user) = user {
            figment = figment.merge(Toml::file(user));
        }
        if let Some(explicit) = explicit {
            if !explicit.is_file() {
                exn::bail!(ErrorKind::MissingFile(explicit.to_path_buf()));
            }
            figment = figment.merge(Toml::file(explicit));
        }
        let figment = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Env::raw().only(&[TOKEN_ENV_VAR]).map(|_| "token".into()));
        let config: Config = figment.extract().or_raise(|| ErrorKind::Invalid("unreadable values".to_string()))?;
        config.validate()?;
        tracing::debug!(cache_dir = %config.cache_dir.display(), use_cache = config.use_cache, "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            exn::bail!(ErrorKind::Invalid("max_file_size must be greater than zero".to_string()));
        }
        if self.cache_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("cache_dir must not be empty".to_string()));
        }
        Ok(())
    }

    /// The API token, if one is configured and not blank.
    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_raise(|| ErrorKind::MissingCredential(TOKEN_ENV_VAR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = Config::load_from(None, None).unwrap();
            assert_eq!(config.token, None);
            assert!(config.use_cache);
            assert!(config.include_private);
            assert_eq!(config.max_repos, None);
            assert_eq!(config.max_file_size, 1_048_576);
            assert!(config.cache_dir.ends_with("repos"));
            Ok(())
        });
    }

    #[test]
    fn test_precedence() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("user.toml", "use_cache = false\nmax_repos = 1\ntoken = \"from-user\"")?;
            jail.create_file("explicit.toml", "max_repos = 2\ncache_dir = \"/tmp/honey\"")?;
            jail.set_env("TRAWL_MAX_FILE_SIZE", "2048");
            jail.set_env("TRAWL_TOKEN", "from-prefixed");
            let config = Config::load_from(Some(Path::new("user.toml")), Some(Path::new("explicit.toml"))).unwrap();
            assert!(!config.use_cache);
            assert_eq!(config.max_repos, Some(2));
            assert_eq!(config.cache_dir, PathBuf::from("/tmp/honey"));
            assert_eq!(config.max_file_size, 2048);
            assert_eq!(config.token().unwrap(), "from-prefixed");

            jail.set_env("GH_TOKEN", "from-gh");
            let config = Config::load_from(Some(Path::new("user.toml")), Some(Path::new("explicit.toml"))).unwrap();
            assert_eq!(config.token().unwrap(), "from-gh");
            Ok(())
        });
    }

    #[test]
    fn test_missing_user_file_is_ignored() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = Config::load_from(Some(Path::new("does-not-exist.toml")), None).unwrap();
            assert!(config.use_cache);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|_jail| {
            let err = Config::load_from(None, Some(Path::new("does-not-exist.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::MissingFile(path) if path.ends_with("does-not-exist.toml")));
            Ok(())
        });
    }

    #[rstest]
    #[case("max_file_size = 0")]
    #[case("max_repos = \"lots\"")]
    #[case("use_cache = [")]
    fn test_invalid_file(#[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("explicit.toml", contents)?;
            let err = Config::load_from(None, Some(Path::new("explicit.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            Ok(())
        });
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn test_missing_token(#[case] token: Option<&str>) {
        let config = Config {
            token: token.map(str::to_string),
            ..Config::default()
        };
        let err = config.token().unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingCredential("GH_TOKEN")));
    }

    #[test]
    fn test_load_from_tempdir_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trawl.toml");
        std::fs::write(&path, "include_private = false").unwrap();
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = Config::load_from(None, Some(&path)).unwrap();
            assert!(!config.include_private);
            Ok(())
        });
    }
}
