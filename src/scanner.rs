//! Background directory enumeration that seeds the index.
//!
//! The walk runs on its own thread via the parallel walker from `ignore`,
//! reporting every regular file through `on_file` and firing `on_finished`
//! exactly once when traversal ends or is cancelled. Directory names
//! starting with `.` or `$` are skipped wholesale.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use ignore::{DirEntry, WalkBuilder, WalkState};
use tracing::{debug, info};

use crate::index::SearchIndex;

/// Handle to an in-flight directory scan. Cancellation is cooperative and
/// observed per directory entry; dropping the handle cancels and joins.
pub struct DirScanner {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DirScanner {
    /// Walk `root` recursively on a background thread.
    ///
    /// `on_file` is invoked for every regular file found (possibly from
    /// several walker threads at once); `on_finished` is invoked exactly
    /// once afterward, whether the traversal completed or was cancelled.
    pub fn spawn<F, G>(root: PathBuf, on_file: F, on_finished: G) -> Self
    where
        F: Fn(&Path) + Send + Sync + 'static,
        G: FnOnce() + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = Arc::clone(&cancel);

        let handle = std::thread::spawn(move || {
            info!(root = %root.display(), "starting directory scan");

            let walker = WalkBuilder::new(&root)
                .standard_filters(false)
                .follow_links(false)
                .filter_entry(keep_entry)
                .build_parallel();

            let on_file = &on_file;
            walker.run(|| {
                let cancel = Arc::clone(&cancel_flag);
                Box::new(move |result| {
                    if cancel.load(Ordering::Relaxed) {
                        return WalkState::Quit;
                    }
                    if let Ok(entry) = result
                        && entry.file_type().is_some_and(|ft| ft.is_file())
                    {
                        on_file(entry.path());
                    }
                    WalkState::Continue
                })
            });

            debug!(root = %root.display(), "directory scan finished");
            on_finished();
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Request cancellation. The walk quits before visiting its next entry.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Block until the walk has ended and `on_finished` has run.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DirScanner {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Seed `index` from its current root. Convenience wiring of
/// [`DirScanner::spawn`] into [`SearchIndex::add_entry`].
pub fn populate(index: &SearchIndex) -> DirScanner {
    let root = index.root();
    let feed = index.clone();
    let done = index.clone();
    DirScanner::spawn(
        root,
        move |path| {
            feed.add_entry(path);
        },
        move || {
            info!(entries = done.entry_count(), "initial population finished");
        },
    )
}

fn keep_entry(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
        return true;
    }
    !entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.') || name.starts_with('$'))
}
