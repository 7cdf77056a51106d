//! The search index: a live entry set, a revision counter, and a background
//! worker that rescans unscored entries and publishes ranked snapshots.
//!
//! Three locks with disjoint jobs (none is ever held across a matcher call):
//! the entry set, the `(query, stop)` signal paired with a condvar the
//! worker sleeps on, and the briefly-held published-snapshot slot. The
//! revision itself is an `AtomicU64`, always bumped while holding the signal
//! lock so the worker's check-then-wait cannot lose a wakeup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::path_utils::natural_cmp;
use crate::score::{self, MatchPositions, NAME_MATCH_WEIGHT};
use crate::types::{FileEntry, MatchKind, SearchHit, SearchSnapshot};

/// Fuzzy quick-open index over one root directory.
///
/// Cheap to clone; all clones share the same underlying index. The scanner
/// and watcher threads mutate the entry set through their own clones while
/// the presentation thread calls [`search`](Self::search) and
/// [`get_results`](Self::get_results) without ever blocking on scoring.
#[derive(Clone)]
pub struct SearchIndex {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<IndexState>,
    signal: Mutex<QuerySignal>,
    work_available: Condvar,
    revision: AtomicU64,
    stop: AtomicBool,
    snapshot: Mutex<Arc<SearchSnapshot>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct IndexState {
    root: PathBuf,
    /// Sorted by absolute path for binary-search insert/remove and for a
    /// contiguous range under any directory prefix.
    entries: Vec<FileEntry>,
}

struct QuerySignal {
    query: String,
}

/// A scoring job cloned out of the entry set so no lock spans a matcher call.
struct ScoreJob {
    index: usize,
    file_name: String,
    relative_path: String,
}

enum Pass {
    Completed,
    Superseded,
}

impl SearchIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(IndexState {
                    root: root.into(),
                    entries: Vec::new(),
                }),
                signal: Mutex::new(QuerySignal {
                    query: String::new(),
                }),
                work_available: Condvar::new(),
                revision: AtomicU64::new(0),
                stop: AtomicBool::new(false),
                snapshot: Mutex::new(Arc::new(SearchSnapshot::empty(0))),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.inner.state.lock().root.clone()
    }

    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    pub fn entry_count(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Discard every entry and the published snapshot, then record the new
    /// root. Does not enumerate anything itself; the caller restarts the
    /// scanner and watcher against the new root.
    pub fn set_root(&self, root: impl Into<PathBuf>) {
        let root = root.into();
        info!(root = %root.display(), "setting index root");

        {
            let mut state = self.inner.state.lock();
            state.root = root;
            state.entries.clear();
        }
        let revision = self.bump_revision();
        self.publish(SearchSnapshot::empty(revision));
    }

    /// Insert a file into the entry set. Returns false (and leaves the
    /// revision alone) when the path is already indexed.
    pub fn add_entry(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let inserted = {
            let mut state = self.inner.state.lock();
            match state
                .entries
                .binary_search_by(|e| e.path.as_path().cmp(path))
            {
                Ok(_) => false,
                Err(pos) => {
                    let entry = FileEntry::new(path.to_path_buf(), &state.root);
                    state.entries.insert(pos, entry);
                    true
                }
            }
        };

        if inserted {
            trace!(path = %path.display(), "entry added");
            self.bump_revision();
        }
        inserted
    }

    /// Remove the entry with this exact absolute path, if indexed.
    pub fn remove_entry(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let removed = {
            let mut state = self.inner.state.lock();
            match state
                .entries
                .binary_search_by(|e| e.path.as_path().cmp(path))
            {
                Ok(pos) => {
                    state.entries.remove(pos);
                    true
                }
                Err(_) => false,
            }
        };

        if removed {
            trace!(path = %path.display(), "entry removed");
            self.bump_revision();
        }
        removed
    }

    /// Remove every entry below `dir`. Used when a directory deletion
    /// arrives as a single filesystem event. Returns the number removed.
    pub fn remove_entries_under(&self, dir: impl AsRef<Path>) -> usize {
        let dir = dir.as_ref();
        let removed = {
            let mut state = self.inner.state.lock();
            let before = state.entries.len();
            state.entries.retain(|e| !e.path.starts_with(dir));
            before - state.entries.len()
        };

        if removed > 0 {
            debug!(dir = %dir.display(), removed, "removed entries under directory");
            self.bump_revision();
        }
        removed
    }

    /// Rewrite every entry whose absolute path starts (component-wise) with
    /// `old`, covering both a single-file rename and an ancestor-directory
    /// rename. Returns the number of entries rewritten.
    pub fn rename_entry(&self, old: impl AsRef<Path>, new: impl AsRef<Path>) -> usize {
        let old = old.as_ref();
        let new = new.as_ref();
        let renamed = {
            let mut state = self.inner.state.lock();
            let root = state.root.clone();
            let mut count = 0usize;
            for entry in state.entries.iter_mut() {
                if entry.rename(old, new, &root) {
                    count += 1;
                }
            }
            if count > 0 {
                state.entries.sort_unstable_by(|a, b| a.path.cmp(&b.path));
                // A rename can land on an already-indexed path; keep the
                // entry set unique per absolute path.
                state.entries.dedup_by(|a, b| a.path == b.path);
            }
            count
        };

        if renamed > 0 {
            debug!(old = %old.display(), new = %new.display(), renamed, "entries renamed");
            self.bump_revision();
        }
        renamed
    }

    /// Record a new query and wake the worker. A query equal to the one
    /// already in flight is a no-op and does not bump the revision.
    pub fn search(&self, query: &str) {
        let mut signal = self.inner.signal.lock();
        if signal.query == query {
            return;
        }
        debug!(?query, "query changed");
        signal.query.clear();
        signal.query.push_str(query);
        self.inner.revision.fetch_add(1, Ordering::AcqRel);
        self.inner.work_available.notify_all();
    }

    /// The most recently published snapshot. Never blocks on the worker.
    pub fn get_results(&self) -> Arc<SearchSnapshot> {
        Arc::clone(&self.inner.snapshot.lock())
    }

    /// Start the background scoring worker. `on_results_changed` runs on the
    /// worker thread after every published snapshot with no index lock held;
    /// it must not call [`stop_worker`](Self::stop_worker), which would
    /// deadlock the join.
    pub fn start_worker<F>(&self, on_results_changed: F) -> Result<()>
    where
        F: Fn() + Send + 'static,
    {
        let mut slot = self.inner.worker.lock();
        if slot.is_some() {
            return Err(Error::WorkerAlreadyStarted);
        }

        self.inner.stop.store(false, Ordering::Release);
        let inner = Arc::clone(&self.inner);
        let handle = std::thread::Builder::new()
            .name("quickopen-worker".into())
            .spawn(move || worker_loop(&inner, &on_results_changed))
            .map_err(Error::WorkerSpawn)?;

        *slot = Some(handle);
        info!("search worker started");
        Ok(())
    }

    /// Request stop and block until the worker thread has fully exited,
    /// even mid-scoring. The index stays usable and the worker restartable.
    pub fn stop_worker(&self) -> Result<()> {
        {
            let _signal = self.inner.signal.lock();
            self.inner.stop.store(true, Ordering::Release);
            self.inner.revision.fetch_add(1, Ordering::AcqRel);
            self.inner.work_available.notify_all();
        }

        let handle = self.inner.worker.lock().take();
        if let Some(handle) = handle {
            handle.join().map_err(|_| Error::WorkerPanic)?;
            info!("search worker stopped");
        }
        Ok(())
    }

    /// Bump while holding the signal lock so a worker between its revision
    /// check and its condvar wait cannot miss the notification.
    fn bump_revision(&self) -> u64 {
        let _signal = self.inner.signal.lock();
        let revision = self.inner.revision.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.work_available.notify_all();
        revision
    }

    /// Replace the published snapshot unless a newer one is already out.
    fn publish(&self, snapshot: SearchSnapshot) {
        publish_snapshot(&self.inner, snapshot);
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SearchIndex")
            .field("root", &state.root)
            .field("entries", &state.entries.len())
            .field("revision", &self.inner.revision.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn publish_snapshot(inner: &Inner, snapshot: SearchSnapshot) -> bool {
    let mut slot = inner.snapshot.lock();
    if snapshot.revision < slot.revision {
        return false;
    }
    *slot = Arc::new(snapshot);
    true
}

fn worker_loop<F: Fn()>(inner: &Inner, on_results_changed: &F) {
    let mut seen_revision = 0u64;
    // The query the cached entry states were last computed against; drives
    // the rescore-scope decision.
    let mut scored_query = String::new();

    loop {
        let (revision, query) = {
            let mut signal = inner.signal.lock();
            loop {
                if inner.stop.load(Ordering::Acquire) {
                    return;
                }
                let current = inner.revision.load(Ordering::Acquire);
                if current != seen_revision {
                    break (current, signal.query.clone());
                }
                inner.work_available.wait(&mut signal);
            }
        };
        seen_revision = revision;

        reset_outdated(inner, &scored_query, &query);
        scored_query.clear();
        scored_query.push_str(&query);

        match score_pending(inner, revision, &query) {
            Pass::Completed => {
                if let Some(snapshot) = collect_hits(inner, revision) {
                    if publish_snapshot(inner, snapshot) {
                        trace!(revision, "snapshot published");
                        on_results_changed();
                    }
                }
            }
            Pass::Superseded => {
                trace!(revision, "scoring pass superseded");
            }
        }
    }
}

/// Decide the rescoring scope for a query transition and reset accordingly.
///
/// Same query: only entries that have never been scored need work. The new
/// query extends the previous one: narrowing can only lose matches, so only
/// previously-matching entries rescore and every NoMatch verdict stands.
/// Anything else (shrunk or diverged query, or extending the empty query,
/// whose NoMatch verdicts are vacuous): reset everything.
fn reset_outdated(inner: &Inner, previous: &str, query: &str) {
    if query == previous {
        return;
    }

    let narrowing = !previous.is_empty() && query.starts_with(previous);
    let mut state = inner.state.lock();
    for entry in state.entries.iter_mut() {
        if !narrowing || entry.is_match() {
            entry.reset();
        }
    }
}

fn score_pending(inner: &Inner, revision: u64, query: &str) -> Pass {
    let jobs: Vec<ScoreJob> = {
        let state = inner.state.lock();
        state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_scored())
            .map(|(index, e)| ScoreJob {
                index,
                file_name: e.file_name.clone(),
                relative_path: e.relative_path.clone(),
            })
            .collect()
    };

    if jobs.is_empty() {
        return Pass::Completed;
    }
    trace!(pending = jobs.len(), ?query, "scoring pass");

    for job in jobs {
        // Cancellation is observed at per-entry granularity: a newer
        // revision or a stop request abandons the pass before the next
        // matcher call, so a stale scan never delays a fresh query.
        if inner.stop.load(Ordering::Acquire)
            || inner.revision.load(Ordering::Acquire) != revision
        {
            return Pass::Superseded;
        }

        let (score, match_kind, positions) = score_entry(query, &job);

        let mut state = inner.state.lock();
        if inner.revision.load(Ordering::Acquire) != revision {
            return Pass::Superseded;
        }
        // Revision unchanged means the entry set is unchanged, so the job
        // index still names the same entry.
        if let Some(entry) = state.entries.get_mut(job.index) {
            entry.score = score;
            entry.match_kind = match_kind;
            entry.positions = positions;
        }
    }

    Pass::Completed
}

/// Score one entry: the file-name component first, then the full relative
/// path, else NoMatch. A name match carries `NAME_MATCH_WEIGHT` on top so it
/// ordinarily outranks any path-only match; its positions are shifted to
/// index into the relative path like path-match positions do.
fn score_entry(query: &str, job: &ScoreJob) -> (i32, MatchKind, MatchPositions) {
    if let Some(m) = score::fuzzy_match(query, &job.file_name) {
        let offset = job
            .relative_path
            .chars()
            .count()
            .saturating_sub(job.file_name.chars().count());
        let positions = m
            .positions
            .iter()
            .map(|p| p + offset as u32)
            .collect::<MatchPositions>();
        return (
            m.score.saturating_add(NAME_MATCH_WEIGHT),
            MatchKind::FileName,
            positions,
        );
    }

    if let Some(m) = score::fuzzy_match(query, &job.relative_path) {
        return (m.score, MatchKind::Path, m.positions);
    }

    (0, MatchKind::NoMatch, MatchPositions::new())
}

/// Rebuild the result list from the live entry set, sort it, and hand it
/// back for publication. Returns `None` when the pass went stale between
/// scoring and collection.
fn collect_hits(inner: &Inner, revision: u64) -> Option<SearchSnapshot> {
    let mut hits: Vec<SearchHit> = {
        let state = inner.state.lock();
        if inner.revision.load(Ordering::Acquire) != revision {
            return None;
        }
        state
            .entries
            .iter()
            .filter(|e| e.is_match())
            .map(|e| SearchHit {
                relative_path: e.relative_path.clone(),
                score: e.score,
                match_kind: e.match_kind,
                positions: e.positions.clone(),
            })
            .collect()
    };

    // Descending score; ties by ascending case-insensitive natural path
    // order, then by raw bytes so the order is total and reproducible.
    hits.sort_unstable_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| natural_cmp(&a.relative_path, &b.relative_path))
            .then_with(|| a.relative_path.cmp(&b.relative_path))
    });

    Some(SearchSnapshot { revision, hits })
}
