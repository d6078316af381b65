//! Integration tests for the traversal pipeline
//!
//! Each test builds a real tree under a temp directory, runs the full
//! pipeline against it and checks emission order, completion propagation
//! and the counts a backup run would report.

use backup_walker::cancel::cancellation;
use backup_walker::pipeline::{
    ack_channel, split, walk, EntryInfo, Filter, Job, SplitWorkerPool, WorkerPool,
};
use crossbeam_channel::{bounded, Receiver};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;

fn accept_all(_: &Path, _: &EntryInfo) -> bool {
    true
}

/// One observed job, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
struct Emitted {
    is_dir: bool,
    path: PathBuf,
    children: usize,
}

/// Single consumer that records jobs in the order they arrive and obeys
/// the acknowledgement contract. Because it asserts that every child
/// acknowledgement is already deliverable when the parent directory job
/// shows up, it doubles as the children-before-parents check.
fn record_jobs(jobs: Receiver<Job>) -> thread::JoinHandle<Vec<Emitted>> {
    thread::spawn(move || {
        let mut seen = Vec::new();
        for job in jobs.iter() {
            match job {
                Job::File(file) => {
                    seen.push(Emitted {
                        is_dir: false,
                        path: file.path.clone(),
                        children: 0,
                    });
                    file.complete(true);
                }
                Job::Dir(mut dir) => {
                    let children = dir.entries.len();
                    for entry in dir.entries.drain(..) {
                        assert_eq!(
                            entry.wait(),
                            Some(true),
                            "child must be acknowledged before its parent completes"
                        );
                    }
                    seen.push(Emitted {
                        is_dir: true,
                        path: dir.path.clone(),
                        children,
                    });
                    dir.complete(true);
                }
            }
        }
        seen
    })
}

/// Run a traversal against a recording consumer.
fn run_recorded(roots: &[PathBuf], filter: &Filter) -> (Vec<Emitted>, Option<bool>) {
    let (_token, cancel) = cancellation();
    let (jobs_tx, jobs_rx) = bounded(200);
    let (root_ack, root_res) = ack_channel();

    let recorder = record_jobs(jobs_rx);
    walk(roots, filter, &cancel, &jobs_tx, root_ack).expect("walk failed");
    drop(jobs_tx);

    let seen = recorder.join().expect("recorder panicked");
    (seen, root_res.wait())
}

/// Count directories and files with an independent recursive stat-walk.
fn stat_walk(path: &Path) -> (u64, u64) {
    let meta = fs::symlink_metadata(path).expect("stat");
    if !meta.is_dir() {
        return (0, 1);
    }

    let mut dirs = 1;
    let mut files = 0;
    for entry in fs::read_dir(path).expect("read_dir") {
        let (d, f) = stat_walk(&entry.expect("dir entry").path());
        dirs += d;
        files += f;
    }
    (dirs, files)
}

fn write_file(path: &Path, content: &[u8]) {
    let mut file = File::create(path).expect("create file");
    file.write_all(content).expect("write file");
}

#[test]
fn test_empty_tree_yields_single_dir_job() {
    let dir = tempfile::tempdir().expect("tempdir");

    let (seen, ack) = run_recorded(&[dir.path().to_owned()], &accept_all);

    assert_eq!(
        seen,
        [Emitted {
            is_dir: true,
            path: dir.path().to_owned(),
            children: 0,
        }]
    );
    assert_eq!(ack, Some(true));
}

#[test]
fn test_single_file_emitted_before_its_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(&dir.path().join("a"), b"a");

    let (seen, ack) = run_recorded(&[dir.path().to_owned()], &accept_all);

    assert_eq!(
        seen,
        [
            Emitted {
                is_dir: false,
                path: dir.path().join("a"),
                children: 0,
            },
            Emitted {
                is_dir: true,
                path: dir.path().to_owned(),
                children: 1,
            },
        ]
    );
    assert_eq!(ack, Some(true));
}

#[test]
fn test_nested_tree_is_post_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(&dir.path().join("x"), b"x");
    fs::create_dir(dir.path().join("y")).expect("mkdir");
    write_file(&dir.path().join("y").join("z"), b"z");

    let (seen, ack) = run_recorded(&[dir.path().to_owned()], &accept_all);

    assert_eq!(
        seen,
        [
            Emitted {
                is_dir: false,
                path: dir.path().join("x"),
                children: 0,
            },
            Emitted {
                is_dir: false,
                path: dir.path().join("y").join("z"),
                children: 0,
            },
            Emitted {
                is_dir: true,
                path: dir.path().join("y"),
                children: 1,
            },
            Emitted {
                is_dir: true,
                path: dir.path().to_owned(),
                children: 2,
            },
        ]
    );
    assert_eq!(ack, Some(true));
}

#[test]
fn test_filter_drops_entry_without_enrollment() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(&dir.path().join("x"), b"x");
    fs::create_dir(dir.path().join("y")).expect("mkdir");
    write_file(&dir.path().join("y").join("z"), b"z");

    let reject_x = |path: &Path, _: &EntryInfo| !path.ends_with("x");
    let (seen, ack) = run_recorded(&[dir.path().to_owned()], &reject_x);

    assert_eq!(
        seen,
        [
            Emitted {
                is_dir: false,
                path: dir.path().join("y").join("z"),
                children: 0,
            },
            Emitted {
                is_dir: true,
                path: dir.path().join("y"),
                children: 1,
            },
            Emitted {
                is_dir: true,
                path: dir.path().to_owned(),
                children: 1,
            },
        ]
    );
    assert_eq!(ack, Some(true));
}

#[test]
fn test_filtered_dir_prunes_whole_subtree() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(&dir.path().join("x"), b"x");
    fs::create_dir(dir.path().join("y")).expect("mkdir");
    write_file(&dir.path().join("y").join("z"), b"z");

    let reject_y = |path: &Path, _: &EntryInfo| !path.ends_with("y");
    let (seen, _ack) = run_recorded(&[dir.path().to_owned()], &reject_y);

    // Nothing under y appears, not even its file z.
    assert_eq!(
        seen,
        [
            Emitted {
                is_dir: false,
                path: dir.path().join("x"),
                children: 0,
            },
            Emitted {
                is_dir: true,
                path: dir.path().to_owned(),
                children: 1,
            },
        ]
    );
}

#[test]
fn test_multiple_roots_bundled_under_collection_job() {
    let base = tempfile::tempdir().expect("tempdir");
    let root_a = base.path().join("a");
    let root_b = base.path().join("b");
    fs::create_dir(&root_a).expect("mkdir");
    fs::create_dir(&root_b).expect("mkdir");
    write_file(&root_a.join("f1"), b"1");
    write_file(&root_b.join("f2"), b"2");

    let roots = vec![root_a.clone(), root_b.clone()];
    let (seen, ack) = run_recorded(&roots, &accept_all);

    assert_eq!(
        seen,
        [
            Emitted {
                is_dir: false,
                path: root_a.join("f1"),
                children: 0,
            },
            Emitted {
                is_dir: true,
                path: root_a,
                children: 1,
            },
            Emitted {
                is_dir: false,
                path: root_b.join("f2"),
                children: 0,
            },
            Emitted {
                is_dir: true,
                path: root_b,
                children: 1,
            },
            // The synthetic collection job depends on both roots and
            // carries the acknowledgement the caller awaits.
            Emitted {
                is_dir: true,
                path: PathBuf::new(),
                children: 2,
            },
        ]
    );
    assert_eq!(ack, Some(true));
}

#[test]
fn test_cancellation_unblocks_walker() {
    let dir = tempfile::tempdir().expect("tempdir");
    for i in 0..100 {
        write_file(&dir.path().join(format!("f{:03}", i)), b"data");
    }

    let (token, cancel) = cancellation();
    // Tiny capacity so the walker is parked on a send when the signal
    // fires.
    let (jobs_tx, jobs_rx) = bounded(2);
    let (root_ack, root_res) = ack_channel();

    let consumer = thread::spawn(move || {
        // Acknowledge exactly one job, then cancel and walk away.
        match jobs_rx.recv() {
            Ok(Job::File(file)) => file.complete(true),
            Ok(Job::Dir(dir)) => dir.complete(true),
            Err(_) => {}
        }
        token.cancel();
    });

    let err = walk(
        &[dir.path().to_owned()],
        &accept_all,
        &cancel,
        &jobs_tx,
        root_ack,
    )
    .expect_err("cancelled walk must not complete");

    assert!(err.is_cancelled());
    consumer.join().expect("consumer panicked");

    // No top-level acknowledgement is produced for a cancelled walk.
    assert_eq!(root_res.wait(), None);
}

#[test]
fn test_worker_pool_counts_match_stat_walk() {
    let dir = tempfile::tempdir().expect("tempdir");
    for d in 0..4 {
        let sub = dir.path().join(format!("dir{}", d));
        fs::create_dir(&sub).expect("mkdir");
        for f in 0..5 {
            write_file(&sub.join(format!("file{}", f)), &vec![0u8; 10 * (f + 1)]);
        }
        let nested = sub.join("nested");
        fs::create_dir(&nested).expect("mkdir");
        write_file(&nested.join("deep"), b"deep");
    }

    let (want_dirs, want_files) = stat_walk(dir.path());

    let (_token, cancel) = cancellation();
    let (jobs_tx, jobs_rx) = bounded(200);
    let (root_ack, root_res) = ack_channel();

    let pool = WorkerPool::spawn(8, jobs_rx, cancel.clone()).expect("spawn workers");
    walk(
        &[dir.path().to_owned()],
        &accept_all,
        &cancel,
        &jobs_tx,
        root_ack,
    )
    .expect("walk failed");
    drop(jobs_tx);

    assert_eq!(root_res.wait(), Some(true));

    let totals = pool.join();
    assert_eq!(totals.dirs, want_dirs);
    assert_eq!(totals.files, want_files);
    // 5 files of 10..=50 bytes per dir, plus one 4-byte file each.
    assert_eq!(totals.bytes, 4 * (10 + 20 + 30 + 40 + 50) + 4 * 4);
}

#[test]
fn test_split_pipeline_counts_match_stat_walk() {
    let dir = tempfile::tempdir().expect("tempdir");
    for d in 0..3 {
        let sub = dir.path().join(format!("dir{}", d));
        fs::create_dir(&sub).expect("mkdir");
        for f in 0..8 {
            write_file(&sub.join(format!("file{}", f)), b"x");
        }
    }

    let (want_dirs, want_files) = stat_walk(dir.path());

    let (_token, cancel) = cancellation();
    let (jobs_tx, jobs_rx) = bounded(200);
    let (dirs_tx, dirs_rx) = bounded(200);
    let (files_tx, files_rx) = bounded(200);
    let (root_ack, root_res) = ack_channel();

    let splitter = thread::spawn(move || split(jobs_rx, dirs_tx, files_tx));
    let pool =
        SplitWorkerPool::spawn(4, 2, files_rx, dirs_rx, cancel.clone()).expect("spawn workers");

    walk(
        &[dir.path().to_owned()],
        &accept_all,
        &cancel,
        &jobs_tx,
        root_ack,
    )
    .expect("walk failed");
    drop(jobs_tx);

    splitter.join().expect("splitter panicked");
    assert_eq!(root_res.wait(), Some(true));

    let totals = pool.join();
    assert_eq!(totals.dirs, want_dirs);
    assert_eq!(totals.files, want_files);
}

#[test]
fn test_rewalk_emits_identical_sequence() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["zeta", "alpha", "10", "1", "mid"] {
        write_file(&dir.path().join(name), b"x");
    }
    fs::create_dir(dir.path().join("sub")).expect("mkdir");
    write_file(&dir.path().join("sub").join("inner"), b"x");

    let (first, _) = run_recorded(&[dir.path().to_owned()], &accept_all);
    let (second, _) = run_recorded(&[dir.path().to_owned()], &accept_all);

    assert_eq!(first, second);

    // Siblings arrive in byte-wise lexicographic order.
    let file_names: Vec<_> = first
        .iter()
        .filter(|e| !e.is_dir)
        .map(|e| e.path.file_name().expect("name").to_string_lossy().into_owned())
        .collect();
    assert_eq!(file_names, ["1", "10", "alpha", "mid", "inner", "zeta"]);
}

#[test]
fn test_job_count_equals_accepted_entry_count() {
    let dir = tempfile::tempdir().expect("tempdir");
    for d in 0..3 {
        let sub = dir.path().join(format!("d{}", d));
        fs::create_dir(&sub).expect("mkdir");
        for f in 0..3 {
            write_file(&sub.join(format!("f{}", f)), b"x");
        }
    }

    let (want_dirs, want_files) = stat_walk(dir.path());
    let (seen, _) = run_recorded(&[dir.path().to_owned()], &accept_all);

    let dirs = seen.iter().filter(|e| e.is_dir).count() as u64;
    let files = seen.iter().filter(|e| !e.is_dir).count() as u64;
    assert_eq!(dirs, want_dirs);
    assert_eq!(files, want_files);
}
