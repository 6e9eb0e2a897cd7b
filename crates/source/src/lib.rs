//! Repository source types for trawl.
//!
//! A [`RepositorySource`] is the capability surface of a hosted
//! version-control API: it lists a user's repositories, describes them, lists
//! their directories and hands out file contents. Everything the crawler knows
//! about the outside world comes through this trait.

pub mod backend;
pub mod error;
pub mod models;

pub use crate::backend::RepositorySource;
#[cfg(feature = "mock")]
pub use crate::backend::{MockRepository, MockSource};
pub use crate::models::{Encoding, Entry, EntryKind, FileRecord, RepoHandle, RepositoryMetadata};
use std::sync::Arc;

pub type SourceHandle = Arc<dyn RepositorySource>;
