//! Job stream demultiplexer
//!
//! [`split`] fans a single job stream onto two typed streams so callers
//! can run separate worker pools for files and directories. Same-kind
//! jobs keep their relative order; nothing is guaranteed across kinds.

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::pipeline::job::{DirJob, FileJob, Job};

/// Forward every job from `jobs` to `dirs` or `files` by variant.
///
/// Returns when `jobs` disconnects, or early when a destination has no
/// receivers left (shutdown). The senders are consumed; dropping them on
/// return is what closes the outputs once no other clones exist, so a
/// caller that wants the outputs to stay open keeps its own clones.
pub fn split(jobs: Receiver<Job>, dirs: Sender<DirJob>, files: Sender<FileJob>) {
    for job in jobs.iter() {
        let delivered = match job {
            Job::Dir(dir) => dirs.send(dir).is_ok(),
            Job::File(file) => files.send(file).is_ok(),
        };

        if !delivered {
            debug!("job receivers gone, stopping split");
            return;
        }
    }
}
