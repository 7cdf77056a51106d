use std::path::{Path, PathBuf};

use crate::score::MatchPositions;

/// How an entry matched the in-flight query, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Not yet scored against the current query.
    Unscored,
    /// The pattern matched within the file-name component.
    FileName,
    /// The pattern matched the full relative path only.
    Path,
    /// The pattern matched neither; excluded from results.
    NoMatch,
}

/// One indexed file: its identity plus the match state cached by the worker.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Absolute path; the key the entry set is sorted and deduplicated by.
    pub path: PathBuf,
    /// Path relative to the index root, as displayed in results.
    pub relative_path: String,
    /// File-name component, scored before the full relative path.
    pub file_name: String,
    pub score: i32,
    pub match_kind: MatchKind,
    /// Character indices into `relative_path` consumed by the match.
    pub positions: MatchPositions,
}

impl FileEntry {
    pub fn new(path: PathBuf, root: &Path) -> Self {
        let relative_path = pathdiff::diff_paths(&path, root)
            .unwrap_or_else(|| path.clone())
            .to_string_lossy()
            .into_owned();

        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        Self {
            path,
            relative_path,
            file_name,
            score: 0,
            match_kind: MatchKind::Unscored,
            positions: MatchPositions::new(),
        }
    }

    /// Discard the cached match state, forcing rescoring. Identity is kept.
    pub fn reset(&mut self) {
        self.score = 0;
        self.match_kind = MatchKind::Unscored;
        self.positions.clear();
    }

    #[inline]
    pub fn is_scored(&self) -> bool {
        self.match_kind != MatchKind::Unscored
    }

    #[inline]
    pub fn is_match(&self) -> bool {
        matches!(self.match_kind, MatchKind::FileName | MatchKind::Path)
    }

    /// Rewrite the stored paths if `path` starts with `old_prefix`
    /// (component-wise), covering both a rename of this exact file and a
    /// rename of an ancestor directory. Returns whether the rewrite applied;
    /// an applied rewrite resets the cached match state.
    pub fn rename(&mut self, old_prefix: &Path, new_prefix: &Path, root: &Path) -> bool {
        let Ok(rest) = self.path.strip_prefix(old_prefix) else {
            return false;
        };

        let new_path = if rest.as_os_str().is_empty() {
            new_prefix.to_path_buf()
        } else {
            new_prefix.join(rest)
        };

        *self = FileEntry::new(new_path, root);
        true
    }
}

/// One published result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub relative_path: String,
    pub score: i32,
    pub match_kind: MatchKind,
    pub positions: MatchPositions,
}

/// An immutable, fully-scored, sorted result list. Published atomically by
/// the worker; readers clone the `Arc`, never the contents.
#[derive(Debug, Clone)]
pub struct SearchSnapshot {
    /// The revision the pass that produced this snapshot was scored at.
    pub revision: u64,
    pub hits: Vec<SearchHit>,
}

impl SearchSnapshot {
    pub fn empty(revision: u64) -> Self {
        Self {
            revision,
            hits: Vec::new(),
        }
    }
}
