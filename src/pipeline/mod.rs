//! Concurrent traversal pipeline
//!
//! The pipeline turns a set of root paths into an ordered stream of work
//! items and collects their acknowledgements, so that a directory is only
//! reported done after everything inside it is.
//!
//! # Architecture
//!
//! ```text
//!  roots ──► Walker ──► Job stream ──► (Splitter) ──► workers
//!                │                                       │
//!                └── per-job ack channels ◄──────────────┘
//!                        │
//!                        └── top-level ack ◄── awaited by the caller
//! ```
//!
//! The walker is the only producer. Workers are attached by the caller in
//! any number; each one owes exactly one boolean acknowledgement per job
//! it takes. A directory job carries the acknowledgement sources of its
//! children, emitted earlier, which is the entire dependency mechanism:
//! no shared state, no central completion table.

pub mod job;
pub mod split;
pub mod walker;
pub mod worker;

pub use job::{ack_channel, AckReceiver, AckSender, DirJob, EntryInfo, EntryKind, FileJob, Job};
pub use split::split;
pub use walker::{walk, Filter};
pub use worker::{ScanStats, ScanTotals, SplitWorkerPool, WorkerPool};
