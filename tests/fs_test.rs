use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use quickopen::{DirScanner, SearchIndex, populate, watch_index};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(15);

fn create_file(base: &Path, relative: &str) -> PathBuf {
    let full_path = base.join(relative);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&full_path, "contents").unwrap();
    full_path
}

/// Poll until `predicate` holds on the index.
fn wait_until(index: &SearchIndex, what: &str, predicate: impl Fn(&SearchIndex) -> bool) {
    let deadline = Instant::now() + WAIT;
    while !predicate(index) {
        assert!(Instant::now() < deadline, "timed out waiting: {what}");
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn scanner_reports_regular_files_and_skips_dot_and_dollar_dirs() {
    let tmp = TempDir::new().unwrap();
    create_file(tmp.path(), "a.rs");
    create_file(tmp.path(), "src/b.rs");
    create_file(tmp.path(), "src/deep/c.rs");
    create_file(tmp.path(), ".hidden/skipped.rs");
    create_file(tmp.path(), "$cache/skipped.rs");
    create_file(tmp.path(), "src/.git/skipped.rs");
    // A dot *file* is still a file, not a skipped directory.
    create_file(tmp.path(), ".dotfile");

    let found = Arc::new(Mutex::new(Vec::new()));
    let (finished_tx, finished_rx) = mpsc::channel();

    let sink = Arc::clone(&found);
    let scanner = DirScanner::spawn(
        tmp.path().to_path_buf(),
        move |path| {
            sink.lock().unwrap().push(path.to_path_buf());
        },
        move || {
            let _ = finished_tx.send(());
        },
    );

    finished_rx.recv_timeout(WAIT).expect("scan never finished");
    scanner.join();
    // `on_finished` fired exactly once.
    assert!(finished_rx.try_recv().is_err());

    let mut names: Vec<String> = found
        .lock()
        .unwrap()
        .iter()
        .map(|p| {
            p.strip_prefix(tmp.path())
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();

    assert_eq!(names, vec![".dotfile", "a.rs", "src/b.rs", "src/deep/c.rs"]);
}

#[test]
fn cancelled_scan_still_finishes_exactly_once() {
    let tmp = TempDir::new().unwrap();
    for i in 0..50 {
        create_file(tmp.path(), &format!("dir{}/file{i}.rs", i % 5));
    }

    let (finished_tx, finished_rx) = mpsc::channel();
    let scanner = DirScanner::spawn(
        tmp.path().to_path_buf(),
        |_| {},
        move || {
            let _ = finished_tx.send(());
        },
    );

    scanner.cancel();
    finished_rx.recv_timeout(WAIT).expect("cancelled scan never finished");
    scanner.join();
    assert!(finished_rx.try_recv().is_err());
}

#[test]
fn populate_seeds_the_index_from_disk() {
    let tmp = TempDir::new().unwrap();
    create_file(tmp.path(), "src/main.rs");
    create_file(tmp.path(), "src/lib.rs");
    create_file(tmp.path(), "README.md");

    let index = SearchIndex::new(tmp.path());
    index.start_worker(|| {}).unwrap();

    let scanner = populate(&index);
    wait_until(&index, "initial population", |i| i.entry_count() == 3);
    scanner.join();

    index.search("main");
    wait_until(&index, "search results", |i| {
        let snapshot = i.get_results();
        snapshot.hits.len() == 1 && snapshot.hits[0].relative_path == "src/main.rs"
    });

    index.stop_worker().unwrap();
}

#[test]
fn watcher_tracks_create_delete_and_rename() {
    let tmp = TempDir::new().unwrap();
    create_file(tmp.path(), "existing.rs");

    let index = SearchIndex::new(tmp.path());
    index.start_worker(|| {}).unwrap();
    let scanner = populate(&index);
    wait_until(&index, "initial population", |i| i.entry_count() == 1);
    scanner.join();

    let watcher = watch_index(&index).unwrap();

    // Creation shows up.
    let created = create_file(tmp.path(), "fresh.rs");
    wait_until(&index, "created file indexed", |i| i.entry_count() == 2);

    // Deletion disappears.
    fs::remove_file(&created).unwrap();
    wait_until(&index, "deleted file dropped", |i| i.entry_count() == 1);

    // A rename ends with the new path indexed and the old one gone,
    // whether the platform reports it as a rename pair or as
    // remove-plus-create.
    let renamed_from = create_file(tmp.path(), "before.rs");
    wait_until(&index, "rename source indexed", |i| i.entry_count() == 2);
    let renamed_to = tmp.path().join("after.rs");
    fs::rename(&renamed_from, &renamed_to).unwrap();

    wait_until(&index, "rename applied", |i| {
        i.search("after");
        let snapshot = i.get_results();
        snapshot.hits.len() == 1 && snapshot.hits[0].relative_path == "after.rs"
    });
    wait_until(&index, "old name gone", |i| {
        i.search("before");
        i.get_results().hits.is_empty()
    });

    watcher.stop();
    index.stop_worker().unwrap();
}
