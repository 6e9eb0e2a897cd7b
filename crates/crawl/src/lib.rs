//! Crawling repositories into file records.
//!
//! A [`Crawler`] walks each repository's tree breadth-first, filters every
//! path through the classifier ([`should_process`]), decodes eligible files
//! into text and keeps a per-repository snapshot in an optional cache so that
//! unchanged repositories are not walked again.

mod classify;
mod crawler;
mod decode;
pub mod error;

pub use crate::classify::{
    CODE_EXTENSIONS, DOC_EXTENSIONS, IGNORED_DIRS, IGNORED_FILES, is_ignored_dir, language_for, should_process,
};
pub use crate::crawler::{Crawler, DEFAULT_MAX_FILE_SIZE};
pub use crate::decode::decode;
