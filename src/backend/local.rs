//! Directory-rooted object store
//!
//! Objects are plain files under `<root>/<prefix>/<kind>/<name>`, with
//! the configuration object at `<root>/<prefix>/config`. Finalize writes
//! with `create_new`, so an existing object can never be overwritten and
//! the existence check and the write are one atomic step.

use crossbeam_channel::{bounded, select, Receiver};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

use super::{Backend, Blob, ConnSlots, Kind, NAMESPACE_PREFIX};
use crate::cancel::CancelSignal;
use crate::error::{BackendError, BackendResult};

/// Object store rooted at a local directory
pub struct LocalBackend {
    inner: Arc<LocalInner>,
}

struct LocalInner {
    root: PathBuf,
    slots: ConnSlots,
}

impl LocalBackend {
    /// Open (and lay out) a store under `root`.
    pub fn open(root: impl Into<PathBuf>) -> BackendResult<Self> {
        let root = root.into();

        for kind in Kind::ALL {
            if kind.has_names() {
                fs::create_dir_all(root.join(NAMESPACE_PREFIX).join(kind.as_str()))?;
            }
        }

        debug!(root = %root.display(), "opened local backend");

        Ok(Self {
            inner: Arc::new(LocalInner {
                root,
                slots: ConnSlots::default(),
            }),
        })
    }
}

impl LocalInner {
    fn object_path(&self, kind: Kind, name: &str) -> PathBuf {
        let base = self.root.join(NAMESPACE_PREFIX).join(kind.as_str());
        if kind.has_names() {
            base.join(name)
        } else {
            base
        }
    }
}

impl Backend for LocalBackend {
    fn location(&self) -> String {
        self.inner.root.display().to_string()
    }

    fn create(&self) -> BackendResult<Box<dyn Blob>> {
        Ok(Box::new(LocalBlob {
            inner: Arc::clone(&self.inner),
            buf: Vec::new(),
        }))
    }

    fn get(&self, kind: Kind, name: &str) -> BackendResult<Box<dyn Read + Send>> {
        let path = self.inner.object_path(kind, name);
        let file = fs::File::open(path).map_err(|err| not_found_or_io(err, kind, name))?;
        Ok(Box::new(file))
    }

    fn get_ranged(
        &self,
        kind: Kind,
        name: &str,
        offset: u64,
        length: u64,
    ) -> BackendResult<Box<dyn Read + Send>> {
        let path = self.inner.object_path(kind, name);
        let mut file = fs::File::open(path).map_err(|err| not_found_or_io(err, kind, name))?;

        let len = file.metadata()?.len();
        if offset > len {
            return Err(BackendError::InvalidRange { offset, len });
        }
        file.seek(SeekFrom::Start(offset))?;

        if length == 0 {
            Ok(Box::new(file))
        } else {
            Ok(Box::new(file.take(length)))
        }
    }

    fn test(&self, kind: Kind, name: &str) -> BackendResult<bool> {
        match fs::symlink_metadata(self.inner.object_path(kind, name)) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn remove(&self, kind: Kind, name: &str) -> BackendResult<()> {
        let _slot = self.inner.slots.acquire();
        fs::remove_file(self.inner.object_path(kind, name))
            .map_err(|err| not_found_or_io(err, kind, name))
    }

    fn list(&self, kind: Kind, cancel: CancelSignal) -> Receiver<String> {
        let (tx, rx) = bounded(64);

        if !kind.has_names() {
            return rx; // sender dropped: empty, closed stream
        }

        let dir = self.inner.root.join(NAMESPACE_PREFIX).join(kind.as_str());
        let mut names = Vec::new();
        match fs::read_dir(&dir) {
            Ok(entries) => {
                for entry in entries {
                    match entry {
                        Ok(entry) => names.push(entry.file_name().to_string_lossy().into_owned()),
                        Err(err) => {
                            warn!(kind = %kind, error = %err, "skipping unreadable store entry")
                        }
                    }
                }
            }
            Err(err) => {
                warn!(kind = %kind, error = %err, "cannot list store directory");
                return rx;
            }
        }
        names.sort();

        thread::spawn(move || {
            for name in names {
                select! {
                    send(tx, name) -> sent => {
                        if sent.is_err() {
                            return;
                        }
                    }
                    recv(cancel.receiver()) -> _ => return,
                }
            }
        });

        rx
    }
}

fn not_found_or_io(err: std::io::Error, kind: Kind, name: &str) -> BackendError {
    if err.kind() == std::io::ErrorKind::NotFound {
        BackendError::NotFound {
            kind,
            name: name.to_string(),
        }
    } else {
        BackendError::Io(err)
    }
}

struct LocalBlob {
    inner: Arc<LocalInner>,
    buf: Vec<u8>,
}

impl Write for LocalBlob {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.write(data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Blob for LocalBlob {
    fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    fn finalize(self: Box<Self>, kind: Kind, name: &str) -> BackendResult<()> {
        let path = self.inner.object_path(kind, name);
        let _slot = self.inner.slots.acquire();

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::AlreadyExists {
                    BackendError::AlreadyExists {
                        kind,
                        name: name.to_string(),
                    }
                } else {
                    BackendError::Io(err)
                }
            })?;

        file.write_all(&self.buf)?;
        file.sync_all()?;

        debug!(kind = %kind, name, bytes = self.buf.len(), "finalized object");
        Ok(())
    }
}
