//! trawl - crawl hosted repositories into a local snapshot cache

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use trawl_cache::{CacheHandle, CacheStore, JsonCache};
use trawl_config::Config;
use trawl_crawl::Crawler;
use trawl_source::backend::GitHubSource;
use trawl_source::{FileRecord, RepositoryMetadata, RepositorySource, SourceHandle};

#[derive(Parser)]
#[command(name = "trawl", version)]
#[command(about = "Crawl hosted repositories into a local snapshot cache")]
struct Cli {
    /// Configuration file, merged over the platform default
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl repositories, reusing fresh cached snapshots
    Crawl {
        /// Leave private repositories out
        #[arg(long)]
        public_only: bool,

        /// Crawl at most this many repositories, in listing order
        #[arg(long, value_name = "N")]
        max_repos: Option<usize>,

        /// Ignore and do not update the cache
        #[arg(long)]
        no_cache: bool,

        /// Only crawl these repositories
        #[arg(long = "repo", value_name = "OWNER/NAME")]
        repos: Vec<String>,
    },
    /// Remove cached snapshots
    Clear {
        /// Only clear this repository
        #[arg(value_name = "OWNER/NAME")]
        repo: Option<String>,
    },
}

fn report<E>(err: exn::Exn<E>) -> miette::Report
where
    E: std::error::Error + Send + Sync + 'static,
{
    miette::miette!("{err:?}")
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = Config::load(cli.config.as_deref()).map_err(report)?;
    match cli.command {
        Commands::Crawl {
            public_only,
            max_repos,
            no_cache,
            repos,
        } => {
            let source = GitHubSource::new(Some(config.token().map_err(report)?)).map_err(report)?;
            let user = source.username().map_err(report)?;
            tracing::info!(user = %user, source = source.name(), "Authenticated");
            let source: SourceHandle = Arc::new(source);

            let mut crawler = Crawler::new(source.clone()).with_max_file_size(config.max_file_size);
            if config.use_cache && !no_cache {
                let cache: CacheHandle = Arc::new(JsonCache::new(&config.cache_dir).map_err(report)?);
                crawler = crawler.with_cache(cache);
            }

            let include_private = config.include_private && !public_only;
            let max_repos = max_repos.or(config.max_repos);
            let (files, metadata) = match repos.is_empty() {
                true => crawler.crawl_all(include_private, max_repos),
                false => crawl_named(&mut crawler, source.as_ref(), include_private, &repos),
            };
            for repo in &metadata {
                summarize(repo);
            }
            tracing::info!(repositories = metadata.len(), files = files.len(), "Done");
        },
        Commands::Clear { repo } => {
            let cache = JsonCache::new(&config.cache_dir).map_err(report)?;
            cache.clear(repo.as_deref()).map_err(report)?;
        },
    }
    Ok(())
}

/// Crawl only the listed repositories that match `names`, in the order given.
fn crawl_named(
    crawler: &mut Crawler,
    source: &dyn RepositorySource,
    include_private: bool,
    names: &[String],
) -> (Vec<FileRecord>, Vec<RepositoryMetadata>) {
    let listed = match source.list_repositories(include_private) {
        Ok(listed) => listed,
        Err(err) => {
            tracing::error!(error = ?err, "Could not list repositories");
            return (Vec::new(), Vec::new());
        },
    };
    let mut files = Vec::new();
    for name in names {
        match listed.iter().find(|repo| repo.full_name.eq_ignore_ascii_case(name)) {
            Some(repo) => files.extend(crawler.crawl_repository(repo)),
            None => tracing::warn!(repo = %name, "Repository not found"),
        }
    }
    let crawled = crawler.processed_repositories().to_vec();
    (files, crawled)
}

fn summarize(repo: &RepositoryMetadata) {
    let mut languages: Vec<_> = repo.languages.iter().collect();
    languages.sort_by(|a, b| b.1.cmp(a.1));
    let languages = languages.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(", ");
    tracing::info!(
        repo = %repo.full_name,
        commits = repo.total_commits,
        languages = %languages,
        topics = %repo.topics.join(", "),
        "Repository"
    );
}
