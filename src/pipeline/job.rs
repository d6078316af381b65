//! Work items and entry metadata
//!
//! A [`Job`] describes one filesystem entry to be backed up: a leaf
//! [`FileJob`] or a [`DirJob`] that depends on its children. Every job
//! carries the sending half of a single-use acknowledgement channel; the
//! consumer that picks the job up owes exactly one boolean on it. A
//! directory job additionally holds the receiving halves for each of its
//! emitted children, which is how completion propagates bottom-up without
//! any central bookkeeping.

use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::fs::{self, FileType, Metadata};
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use crate::cancel::CancelSignal;

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryKind {
    /// Regular file
    File = 0,
    /// Directory
    Directory = 1,
    /// Symbolic link
    Symlink = 2,
    /// Block device
    BlockDevice = 3,
    /// Character device
    CharDevice = 4,
    /// Named pipe (FIFO)
    Fifo = 5,
    /// Unix socket
    Socket = 6,
}

impl EntryKind {
    /// Classify a probed file type.
    pub fn from_file_type(ft: FileType) -> Self {
        if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_block_device() {
            EntryKind::BlockDevice
        } else if ft.is_char_device() {
            EntryKind::CharDevice
        } else if ft.is_fifo() {
            EntryKind::Fifo
        } else if ft.is_socket() {
            EntryKind::Socket
        } else {
            EntryKind::File
        }
    }

    /// Check if this is a regular file
    pub fn is_file(self) -> bool {
        self == EntryKind::File
    }

    /// Check if this is a directory
    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }
}

/// Metadata for one filesystem entry, captured by a single lstat-style
/// probe at enumeration time and never refreshed.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// Entry kind decoded from the file type
    pub kind: EntryKind,

    /// Size in bytes
    pub size: u64,

    /// File mode (type + permission bits)
    pub mode: u32,

    /// Owning user ID
    pub uid: u32,

    /// Owning group ID
    pub gid: u32,

    /// Number of hard links
    pub nlink: u64,

    /// Last access time (Unix timestamp)
    pub atime: i64,

    /// Last modification time (Unix timestamp)
    pub mtime: i64,

    /// Status change time (Unix timestamp)
    pub ctime: i64,
}

impl EntryInfo {
    /// Probe a path without following symlinks.
    pub fn probe(path: &Path) -> io::Result<Self> {
        Ok(Self::from_metadata(&fs::symlink_metadata(path)?))
    }

    /// Build entry metadata from an already-fetched stat result.
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            kind: EntryKind::from_file_type(meta.file_type()),
            size: meta.size(),
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
            nlink: meta.nlink(),
            atime: meta.atime(),
            mtime: meta.mtime(),
            ctime: meta.ctime(),
        }
    }
}

/// Create a single-use acknowledgement channel.
///
/// Capacity 1, so the acknowledging side never blocks even when nobody is
/// waiting yet.
pub fn ack_channel() -> (AckSender, AckReceiver) {
    let (tx, rx) = bounded(1);
    (AckSender { tx }, AckReceiver { rx })
}

/// The sending half of a job's acknowledgement channel.
///
/// Consumed by [`ack`](AckSender::ack), so a second acknowledgement is
/// unrepresentable.
#[derive(Debug)]
pub struct AckSender {
    tx: Sender<bool>,
}

impl AckSender {
    /// Deliver the success indicator for the job this sender belongs to.
    pub fn ack(self, ok: bool) {
        // The holder of the receiving half may already be gone during
        // shutdown; a dropped acknowledgement is fine then.
        let _ = self.tx.send(ok);
    }
}

/// The receiving half of a job's acknowledgement channel.
#[derive(Debug)]
pub struct AckReceiver {
    rx: Receiver<bool>,
}

impl AckReceiver {
    /// Wait for the acknowledgement. Returns `None` if the job was
    /// discarded without being acknowledged.
    pub fn wait(&self) -> Option<bool> {
        self.rx.recv().ok()
    }

    /// Wait for the acknowledgement while also observing cancellation.
    /// Returns `None` on cancellation or a discarded job.
    pub fn wait_with_cancel(&self, cancel: &CancelSignal) -> Option<bool> {
        select! {
            recv(self.rx) -> msg => msg.ok(),
            recv(cancel.receiver()) -> _ => None,
        }
    }
}

/// A unit of traversal work
#[derive(Debug)]
pub enum Job {
    /// A leaf entry (regular file or non-directory special file)
    File(FileJob),
    /// A directory plus the completion handles of its emitted children
    Dir(DirJob),
}

impl Job {
    /// Path of the described entry. Empty for the synthetic job that
    /// represents a multi-root collection.
    pub fn path(&self) -> &Path {
        match self {
            Job::File(job) => &job.path,
            Job::Dir(job) => &job.path,
        }
    }
}

/// Work item for a leaf entry
#[derive(Debug)]
pub struct FileJob {
    /// Path of the entry
    pub path: PathBuf,

    /// Metadata captured at enumeration time
    pub info: EntryInfo,

    ack: AckSender,
}

impl FileJob {
    pub(crate) fn new(path: PathBuf, info: EntryInfo, ack: AckSender) -> Self {
        Self { path, info, ack }
    }

    /// Acknowledge the job, consuming it.
    pub fn complete(self, ok: bool) {
        self.ack.ack(ok);
    }
}

/// Work item for a directory
///
/// `entries` holds one acknowledgement receiver per immediate child that
/// was emitted for this directory, in enumeration order. Consumers must
/// drain all of them before acknowledging the directory itself.
#[derive(Debug)]
pub struct DirJob {
    /// Path of the directory; empty for the synthetic multi-root job
    pub path: PathBuf,

    /// Metadata captured at enumeration time; `None` for the synthetic
    /// multi-root job, which describes no filesystem object
    pub info: Option<EntryInfo>,

    /// Acknowledgement sources of the emitted children
    pub entries: Vec<AckReceiver>,

    ack: AckSender,
}

impl DirJob {
    pub(crate) fn new(
        path: PathBuf,
        info: EntryInfo,
        entries: Vec<AckReceiver>,
        ack: AckSender,
    ) -> Self {
        Self {
            path,
            info: Some(info),
            entries,
            ack,
        }
    }

    /// The synthetic job bundling several roots into one collection.
    pub(crate) fn collection(entries: Vec<AckReceiver>, ack: AckSender) -> Self {
        Self {
            path: PathBuf::new(),
            info: None,
            entries,
            ack,
        }
    }

    /// Returns true for the synthetic multi-root job.
    pub fn is_collection(&self) -> bool {
        self.info.is_none()
    }

    /// Acknowledge the job, consuming it. Callers must have drained
    /// `entries` first.
    pub fn complete(self, ok: bool) {
        self.ack.ack(ok);
    }
}
