//! Benchmarks for backup-walker
//!
//! Run with: cargo bench

use backup_walker::cancel::cancellation;
use backup_walker::pipeline::{ack_channel, walk, EntryInfo, WorkerPool};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crossbeam_channel::bounded;
use std::fs::{self, File};
use std::path::Path;

fn benchmark_ack_channel(c: &mut Criterion) {
    c.bench_function("ack_round_trip", |b| {
        b.iter(|| {
            let (tx, rx) = ack_channel();
            tx.ack(true);
            black_box(rx.wait());
        })
    });
}

fn benchmark_walk_tree(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    for d in 0..16 {
        let sub = dir.path().join(format!("dir{:02}", d));
        fs::create_dir(&sub).expect("mkdir");
        for f in 0..32 {
            File::create(sub.join(format!("file{:02}", f))).expect("create");
        }
    }

    let accept_all = |_: &Path, _: &EntryInfo| true;

    c.bench_function("walk_tree_16x32", |b| {
        b.iter(|| {
            let (_token, cancel) = cancellation();
            let (jobs_tx, jobs_rx) = bounded(200);
            let (root_ack, root_res) = ack_channel();

            let pool = WorkerPool::spawn(4, jobs_rx, cancel.clone()).expect("spawn workers");
            walk(
                &[dir.path().to_owned()],
                &accept_all,
                &cancel,
                &jobs_tx,
                root_ack,
            )
            .expect("walk failed");
            drop(jobs_tx);

            root_res.wait();
            black_box(pool.join());
        })
    });
}

criterion_group!(benches, benchmark_ack_channel, benchmark_walk_tree);
criterion_main!(benches);
