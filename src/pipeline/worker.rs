//! Reference scan workers
//!
//! Consumers of the job stream must deliver exactly one acknowledgement
//! per job, and must drain a directory job's child acknowledgements
//! before writing their own. These pools implement that discipline for
//! the simplest useful consumer, a scan that counts what a backup would
//! cover. They double as the executable description of the consumer
//! contract: anything talking to the pipeline behaves like this.
//!
//! On cancellation a worker stops taking jobs immediately and does not
//! drain outstanding ones; the producer side has already aborted.

use crossbeam_channel::{select, Receiver};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

use crate::cancel::CancelSignal;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::job::{DirJob, FileJob, Job};

/// Counters shared by all workers of a scan
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Leaf entries acknowledged
    pub files: AtomicU64,

    /// Directories acknowledged (the synthetic multi-root job included)
    pub dirs: AtomicU64,

    /// Sum of leaf entry sizes
    pub bytes: AtomicU64,
}

impl ScanStats {
    fn record_file(&self, size: u64) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size, Ordering::Relaxed);
    }

    fn record_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters.
    pub fn totals(&self) -> ScanTotals {
        ScanTotals {
            files: self.files.load(Ordering::Relaxed),
            dirs: self.dirs.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`ScanStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanTotals {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
}

/// Worker pool consuming the mixed job stream
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    stats: Arc<ScanStats>,
}

impl WorkerPool {
    /// Spawn `count` workers over `jobs`.
    pub fn spawn(count: usize, jobs: Receiver<Job>, cancel: CancelSignal) -> WorkerResult<Self> {
        let stats = Arc::new(ScanStats::default());

        let mut handles = Vec::with_capacity(count);
        for id in 0..count {
            let jobs = jobs.clone();
            let cancel = cancel.clone();
            let stats = Arc::clone(&stats);
            let handle = thread::Builder::new()
                .name(format!("scan-worker-{}", id))
                .spawn(move || worker_loop(id, jobs, cancel, stats))
                .map_err(|e| WorkerError::InitFailed {
                    id,
                    reason: e.to_string(),
                })?;
            handles.push(handle);
        }

        Ok(Self { handles, stats })
    }

    /// Live counters, for progress display.
    pub fn stats(&self) -> Arc<ScanStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for every worker to finish and return the final counters.
    pub fn join(self) -> ScanTotals {
        for handle in self.handles {
            let _ = handle.join();
        }
        self.stats.totals()
    }
}

/// Worker pools consuming the two typed streams produced by
/// [`split`](crate::pipeline::split).
pub struct SplitWorkerPool {
    handles: Vec<JoinHandle<()>>,
    stats: Arc<ScanStats>,
}

impl SplitWorkerPool {
    /// Spawn `file_workers` threads over `files` and `dir_workers`
    /// threads over `dirs`, sharing one set of counters.
    pub fn spawn(
        file_workers: usize,
        dir_workers: usize,
        files: Receiver<FileJob>,
        dirs: Receiver<DirJob>,
        cancel: CancelSignal,
    ) -> WorkerResult<Self> {
        let stats = Arc::new(ScanStats::default());
        let mut handles = Vec::with_capacity(file_workers + dir_workers);

        for id in 0..file_workers {
            let files = files.clone();
            let cancel = cancel.clone();
            let stats = Arc::clone(&stats);
            let handle = thread::Builder::new()
                .name(format!("file-worker-{}", id))
                .spawn(move || file_worker_loop(id, files, cancel, stats))
                .map_err(|e| WorkerError::InitFailed {
                    id,
                    reason: e.to_string(),
                })?;
            handles.push(handle);
        }

        for id in 0..dir_workers {
            let dirs = dirs.clone();
            let cancel = cancel.clone();
            let stats = Arc::clone(&stats);
            let handle = thread::Builder::new()
                .name(format!("dir-worker-{}", id))
                .spawn(move || dir_worker_loop(id, dirs, cancel, stats))
                .map_err(|e| WorkerError::InitFailed {
                    id,
                    reason: e.to_string(),
                })?;
            handles.push(handle);
        }

        Ok(Self { handles, stats })
    }

    /// Live counters, for progress display.
    pub fn stats(&self) -> Arc<ScanStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for every worker to finish and return the final counters.
    pub fn join(self) -> ScanTotals {
        for handle in self.handles {
            let _ = handle.join();
        }
        self.stats.totals()
    }
}

fn worker_loop(id: usize, jobs: Receiver<Job>, cancel: CancelSignal, stats: Arc<ScanStats>) {
    debug!(worker = id, "worker started");

    loop {
        select! {
            recv(jobs) -> msg => {
                let job = match msg {
                    Ok(job) => job,
                    Err(_) => break, // stream exhausted
                };
                let keep_going = match job {
                    Job::File(file) => {
                        handle_file(file, &stats);
                        true
                    }
                    Job::Dir(dir) => handle_dir(dir, &cancel, &stats),
                };
                if !keep_going {
                    break;
                }
            }
            recv(cancel.receiver()) -> _ => break,
        }
    }

    debug!(worker = id, "worker finished");
}

fn file_worker_loop(
    id: usize,
    files: Receiver<FileJob>,
    cancel: CancelSignal,
    stats: Arc<ScanStats>,
) {
    debug!(worker = id, "file worker started");

    loop {
        select! {
            recv(files) -> msg => {
                match msg {
                    Ok(file) => handle_file(file, &stats),
                    Err(_) => break,
                }
            }
            recv(cancel.receiver()) -> _ => break,
        }
    }

    debug!(worker = id, "file worker finished");
}

fn dir_worker_loop(
    id: usize,
    dirs: Receiver<DirJob>,
    cancel: CancelSignal,
    stats: Arc<ScanStats>,
) {
    debug!(worker = id, "dir worker started");

    loop {
        select! {
            recv(dirs) -> msg => {
                let dir = match msg {
                    Ok(dir) => dir,
                    Err(_) => break,
                };
                if !handle_dir(dir, &cancel, &stats) {
                    break;
                }
            }
            recv(cancel.receiver()) -> _ => break,
        }
    }

    debug!(worker = id, "dir worker finished");
}

fn handle_file(file: FileJob, stats: &ScanStats) {
    stats.record_file(file.info.size);
    file.complete(true);
}

/// Await every child acknowledgement, then acknowledge the directory with
/// their conjunction. Returns false when the worker should stop because
/// cancellation fired while waiting.
fn handle_dir(mut dir: DirJob, cancel: &CancelSignal, stats: &ScanStats) -> bool {
    let mut ok = true;
    for entry in dir.entries.drain(..) {
        match entry.wait_with_cancel(cancel) {
            Some(child_ok) => ok &= child_ok,
            None => return false,
        }
    }

    stats.record_dir();
    dir.complete(ok);
    true
}
