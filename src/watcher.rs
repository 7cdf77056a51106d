//! Filesystem watching that keeps the index current.
//!
//! Events are debounced so editor save storms and directory moves arrive as
//! one batch. The mapping to index mutations is deliberately simple: a
//! rename with both endpoints becomes a prefix rewrite, everything else is
//! classified by what is on disk now: an existing regular file is an
//! add-or-refresh, a missing path is a removal.

use std::path::Path;
use std::time::Duration;

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Config, EventKind, RecursiveMode};
use notify_debouncer_full::{
    DebounceEventResult, DebouncedEvent, RecommendedCache, new_debouncer_opt,
};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::index::SearchIndex;

type Debouncer = notify_debouncer_full::Debouncer<notify::RecommendedWatcher, RecommendedCache>;

const DEBOUNCE_TIMEOUT: Duration = Duration::from_millis(250);

/// Event callbacks bundled for the watcher thread.
pub struct WatchCallbacks {
    pub on_created: Box<dyn Fn(&Path) + Send>,
    pub on_deleted: Box<dyn Fn(&Path) + Send>,
    pub on_renamed: Box<dyn Fn(&Path, &Path) + Send>,
}

/// Recursive, debounced watch over one root. Stops on [`stop`](Self::stop)
/// or drop.
pub struct FsWatcher {
    debouncer: Mutex<Option<Debouncer>>,
}

impl FsWatcher {
    pub fn new(root: &Path, callbacks: WatchCallbacks) -> Result<Self> {
        info!(root = %root.display(), "initializing file watcher");

        // Symlinked trees spawn event storms for files outside the root;
        // do not follow them.
        let config = Config::default().with_follow_symlinks(false);

        let mut debouncer = new_debouncer_opt(
            DEBOUNCE_TIMEOUT,
            Some(DEBOUNCE_TIMEOUT / 2), // tick rate for the event span
            move |result: DebounceEventResult| match result {
                Ok(events) => apply_events(&events, &callbacks),
                Err(errors) => error!(?errors, "file watcher errors"),
            },
            RecommendedCache::new(),
            config,
        )?;

        debouncer.watch(root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "file watcher started");

        Ok(Self {
            debouncer: Mutex::new(Some(debouncer)),
        })
    }

    pub fn stop(&self) {
        if let Some(debouncer) = self.debouncer.lock().take() {
            drop(debouncer);
            info!("file watcher stopped");
        }
    }
}

impl Drop for FsWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Watch the index's root and feed events straight into it. A deleted path
/// that is not an indexed file falls back to subtree removal, covering
/// directory deletions that arrive as one event.
pub fn watch_index(index: &SearchIndex) -> Result<FsWatcher> {
    let root = index.root();
    let created = index.clone();
    let deleted = index.clone();
    let renamed = index.clone();

    FsWatcher::new(
        &root,
        WatchCallbacks {
            on_created: Box::new(move |path| {
                created.add_entry(path);
            }),
            on_deleted: Box::new(move |path| {
                if !deleted.remove_entry(path) {
                    deleted.remove_entries_under(path);
                }
            }),
            on_renamed: Box::new(move |old, new| {
                renamed.rename_entry(old, new);
            }),
        },
    )
}

fn apply_events(events: &[DebouncedEvent], callbacks: &WatchCallbacks) {
    for debounced in events {
        // Reads and read-closes fire constantly (previews, greps, the
        // editor itself); reacting to them would churn the index for
        // nothing.
        if matches!(
            debounced.event.kind,
            EventKind::Access(
                AccessKind::Read
                    | AccessKind::Open(_)
                    | AccessKind::Close(AccessMode::Read | AccessMode::Execute)
            )
        ) {
            continue;
        }

        debug!(event = ?debounced.event, "processing fs event");

        if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = debounced.event.kind
            && let [old, new] = debounced.event.paths.as_slice()
        {
            (callbacks.on_renamed)(old, new);
            continue;
        }

        for path in &debounced.event.paths {
            if path.exists() {
                if path.is_file() {
                    (callbacks.on_created)(path);
                }
            } else {
                (callbacks.on_deleted)(path);
            }
        }
    }
}
