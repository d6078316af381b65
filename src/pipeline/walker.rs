//! Recursive traversal producer
//!
//! [`walk`] enumerates one or more root paths depth-first and emits a
//! [`Job`] for every entry the filter accepts. Children are always emitted
//! before their parent, so by the time a consumer sees a directory job the
//! acknowledgement sources it references belong to jobs that are already
//! in flight. Siblings are probed in byte-wise lexicographic name order,
//! which makes repeated walks of an unchanged tree emit identical
//! sequences.
//!
//! Error policy:
//! - root paths that cannot be probed are fatal,
//! - children that cannot be probed are skipped with a warning and are
//!   not enrolled in their parent's completion set,
//! - directories that cannot be enumerated are emitted as empty directory
//!   jobs, so the scan records them without blocking on contents that
//!   will never arrive.
//!
//! Every send observes the cancellation signal; once the signal is seen
//! no further job is written to the stream.

use crossbeam_channel::{select, Sender};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::cancel::CancelSignal;
use crate::error::{WalkError, WalkResult};
use crate::pipeline::job::{ack_channel, AckSender, DirJob, EntryInfo, FileJob, Job};

/// Acceptance predicate consulted once per child, before the child is
/// emitted or recursed into. Must be side-effect-free and callable from
/// any thread.
pub type Filter = dyn Fn(&Path, &EntryInfo) -> bool + Send + Sync;

/// Traverse `roots` and emit a job for every accepted entry into `jobs`.
///
/// The acknowledgement for the top-level job is delivered on the channel
/// behind `root_ack`; the caller keeps the receiving half and awaits it
/// as the traversal-wide completion barrier. With a single root the root's
/// own job carries `root_ack`; with several roots a synthetic collection
/// job depending on every root carries it.
///
/// `walk` returns once the top-level job has been handed off, or with
/// [`WalkError::Cancelled`] as soon as the signal is observed. It closes
/// neither `jobs` nor the acknowledgement channel. On a fatal root error
/// no top-level acknowledgement will ever be produced, so callers must
/// not block on it unconditionally.
pub fn walk(
    roots: &[PathBuf],
    filter: &Filter,
    cancel: &CancelSignal,
    jobs: &Sender<Job>,
    root_ack: AckSender,
) -> WalkResult<()> {
    if let [root] = roots {
        let info = probe_root(root)?;
        return walk_path(root, info, filter, cancel, jobs, root_ack);
    }

    let mut entries = Vec::with_capacity(roots.len());
    for root in roots {
        let info = probe_root(root)?;
        let (ack, entry) = ack_channel();
        entries.push(entry);
        walk_path(root, info, filter, cancel, jobs, ack)?;
    }

    send_job(jobs, cancel, Job::Dir(DirJob::collection(entries, root_ack)))
}

fn probe_root(path: &Path) -> WalkResult<EntryInfo> {
    EntryInfo::probe(path).map_err(|source| WalkError::RootAccess {
        path: path.to_owned(),
        source,
    })
}

/// Emit the subtree under `path` in post-order, then `path` itself.
fn walk_path(
    path: &Path,
    info: EntryInfo,
    filter: &Filter,
    cancel: &CancelSignal,
    jobs: &Sender<Job>,
    ack: AckSender,
) -> WalkResult<()> {
    if !info.kind.is_dir() {
        return send_job(jobs, cancel, Job::File(FileJob::new(path.to_owned(), info, ack)));
    }

    let names = sorted_child_names(path);

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let child = path.join(&name);

        let child_info = match EntryInfo::probe(&child) {
            Ok(info) => info,
            Err(err) => {
                warn!(path = %child.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };

        if !filter(&child, &child_info) {
            debug!(path = %child.display(), "entry rejected by filter");
            continue;
        }

        let (child_ack, child_entry) = ack_channel();
        entries.push(child_entry);

        if child_info.kind.is_dir() {
            walk_path(&child, child_info, filter, cancel, jobs, child_ack)?;
        } else {
            send_job(
                jobs,
                cancel,
                Job::File(FileJob::new(child, child_info, child_ack)),
            )?;
        }
    }

    send_job(
        jobs,
        cancel,
        Job::Dir(DirJob::new(path.to_owned(), info, entries, ack)),
    )
}

/// List a directory's child names in byte-wise lexicographic order.
///
/// The directory handle is closed before this returns, so recursion depth
/// never translates into open-handle count. An unenumerable directory
/// yields an empty list; the caller then records it as an empty directory
/// job rather than failing the scan.
fn sorted_child_names(path: &Path) -> Vec<OsString> {
    let dir = match fs::read_dir(path) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            warn!(path = %path.display(), "permission denied, recording directory as empty");
            return Vec::new();
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot enumerate directory, recording it as empty");
            return Vec::new();
        }
    };

    let mut names = Vec::new();
    for entry in dir {
        match entry {
            Ok(entry) => names.push(entry.file_name()),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable directory entry");
            }
        }
    }

    names.sort();
    names
}

/// Hand one job to the stream, aborting if cancellation fires first.
///
/// The signal is polled before the send so that nothing is written after
/// cancellation has been observed. A stream whose receivers are all gone
/// is treated as cancellation: there is nobody left to work for.
fn send_job(jobs: &Sender<Job>, cancel: &CancelSignal, job: Job) -> WalkResult<()> {
    if cancel.is_cancelled() {
        return Err(WalkError::Cancelled);
    }

    select! {
        send(jobs, job) -> sent => sent.map_err(|_| WalkError::Cancelled),
        recv(cancel.receiver()) -> _ => Err(WalkError::Cancelled),
    }
}
