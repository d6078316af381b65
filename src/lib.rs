//! backup-walker - Concurrent Filesystem Traversal Pipeline
//!
//! The producer side of a content-addressed backup engine: given a set of
//! root paths, emit a structured, ordered stream of work items for every
//! directory and file to back up, and coordinate completion so that a
//! directory is only reported done after every entry inside it.
//!
//! # Features
//!
//! - **Post-order emission**: every job for a directory's descendants is
//!   on the stream before the directory's own job, so consumers can hold
//!   a directory open until its contents are accounted for.
//!
//! - **Per-job acknowledgements**: each job carries a single-use result
//!   channel; a directory job holds its children's receiving halves.
//!   Completion propagates bottom-up with no shared state.
//!
//! - **Deterministic order**: siblings are enumerated in byte-wise
//!   lexicographic order, so re-scanning an unchanged tree produces an
//!   identical job sequence.
//!
//! - **Cooperative cancellation**: a one-shot broadcast unwinds the
//!   producer, the splitter and all workers at any depth, including out
//!   of blocked channel operations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     Job stream      ┌────────────┐    FileJob    ┌─────────┐
//! │  Walker  │────────────────────►│  Splitter  │──────────────►│ workers │
//! │ (1 task) │                     │ (optional) │    DirJob     │  (N)    │
//! └────┬─────┘                     └────────────┘──────────────►│         │
//!      │                                                        └────┬────┘
//!      │          per-job acknowledgement channels                   │
//!      └◄────────────────────────────────────────────────────────────┘
//!                 (a DirJob waits on its children's channels)
//! ```
//!
//! Downstream, processed content lands in a kind-addressed write-once
//! object store behind the [`backend::Backend`] trait.
//!
//! # Example
//!
//! ```no_run
//! use backup_walker::cancel::cancellation;
//! use backup_walker::pipeline::{ack_channel, walk, WorkerPool};
//! use crossbeam_channel::bounded;
//! use std::path::PathBuf;
//!
//! let (_token, cancel) = cancellation();
//! let (jobs_tx, jobs_rx) = bounded(200);
//! let (root_ack, root_res) = ack_channel();
//!
//! let pool = WorkerPool::spawn(8, jobs_rx, cancel.clone()).expect("spawn workers");
//!
//! let roots = vec![PathBuf::from("/home/user")];
//! walk(&roots, &|_, _| true, &cancel, &jobs_tx, root_ack).unwrap();
//! drop(jobs_tx);
//!
//! let _ = root_res.wait();
//! let totals = pool.join();
//! println!("{} files, {} dirs", totals.files, totals.dirs);
//! ```

pub mod backend;
pub mod cancel;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;

pub use backend::{Backend, Blob, Kind, LocalBackend, MemoryBackend};
pub use cancel::{cancellation, CancelSignal, CancelToken};
pub use config::{CliArgs, ScanConfig};
pub use error::{BackendError, ConfigError, WalkError, WorkerError};
pub use pipeline::{
    ack_channel, split, walk, DirJob, EntryInfo, EntryKind, FileJob, Job, ScanStats, ScanTotals,
    SplitWorkerPool, WorkerPool,
};
