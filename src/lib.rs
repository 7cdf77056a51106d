//! quickopen - fuzzy "quick open" file index
//!
//! This crate scores typed patterns against file paths and keeps a mutable
//! index of known files synchronized with live filesystem events. A single
//! background worker rescans only what a change invalidated and publishes
//! immutable, fully-scored, ranked snapshots that readers fetch without
//! blocking.
//!
//! The pieces, leaves first: [`score`] is the pure matcher, [`types`] holds
//! entries and snapshots, [`index::SearchIndex`] is the concurrency core,
//! and [`scanner`] / [`watcher`] are the collaborators that feed it.

pub mod error;
pub mod index;
pub mod path_utils;
pub mod scanner;
pub mod score;
pub mod types;
pub mod watcher;

pub use error::{Error, Result};
pub use index::SearchIndex;
pub use scanner::{DirScanner, populate};
pub use score::{FuzzyMatch, MatchPositions, fuzzy_match, fuzzy_score};
pub use types::{FileEntry, MatchKind, SearchHit, SearchSnapshot};
pub use watcher::{FsWatcher, WatchCallbacks, watch_index};
