//! In-memory object store
//!
//! Same contract as the directory-rooted store, held in a map. Useful as
//! the zero-setup collaborator for tests and for dry runs that should
//! touch no disk.

use crossbeam_channel::{bounded, select, Receiver};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use super::{Backend, Blob, ConnSlots, Kind};
use crate::cancel::CancelSignal;
use crate::error::{BackendError, BackendResult};

type Store = BTreeMap<(Kind, String), Arc<[u8]>>;

/// Object store held entirely in memory
#[derive(Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    store: Mutex<Store>,
    slots: ConnSlots,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The config object carries no name of its own.
fn key(kind: Kind, name: &str) -> (Kind, String) {
    if kind.has_names() {
        (kind, name.to_string())
    } else {
        (kind, String::new())
    }
}

impl Backend for MemoryBackend {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn create(&self) -> BackendResult<Box<dyn Blob>> {
        Ok(Box::new(MemoryBlob {
            inner: Arc::clone(&self.inner),
            buf: Vec::new(),
        }))
    }

    fn get(&self, kind: Kind, name: &str) -> BackendResult<Box<dyn Read + Send>> {
        let data = self
            .inner
            .store()
            .get(&key(kind, name))
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                kind,
                name: name.to_string(),
            })?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn get_ranged(
        &self,
        kind: Kind,
        name: &str,
        offset: u64,
        length: u64,
    ) -> BackendResult<Box<dyn Read + Send>> {
        let data = self
            .inner
            .store()
            .get(&key(kind, name))
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                kind,
                name: name.to_string(),
            })?;

        let len = data.len() as u64;
        if offset > len {
            return Err(BackendError::InvalidRange { offset, len });
        }

        let mut cursor = Cursor::new(data);
        cursor.set_position(offset);

        if length == 0 {
            Ok(Box::new(cursor))
        } else {
            Ok(Box::new(cursor.take(length)))
        }
    }

    fn test(&self, kind: Kind, name: &str) -> BackendResult<bool> {
        Ok(self.inner.store().contains_key(&key(kind, name)))
    }

    fn remove(&self, kind: Kind, name: &str) -> BackendResult<()> {
        let _slot = self.inner.slots.acquire();
        self.inner
            .store()
            .remove(&key(kind, name))
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    fn list(&self, kind: Kind, cancel: CancelSignal) -> Receiver<String> {
        let (tx, rx) = bounded(64);

        if !kind.has_names() {
            return rx;
        }

        // BTreeMap iteration order makes the listing sorted already.
        let names: Vec<String> = self
            .inner
            .store()
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect();

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

struct MemoryBlob {
    inner: Arc<MemoryInner>,
    buf: Vec<u8>,
}

impl Write for MemoryBlob {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.write(data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Blob for MemoryBlob {
    fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    fn finalize(self: Box<Self>, kind: Kind, name: &str) -> BackendResult<()> {
        let inner = Arc::clone(&self.inner);
        let data: Arc<[u8]> = Arc::from(self.buf);

        let _slot = inner.slots.acquire();
        let mut store = inner.store();

        let key = key(kind, name);
        if store.contains_key(&key) {
            return Err(BackendError::AlreadyExists {
                kind,
                name: name.to_string(),
            });
        }

        store.insert(key, data);
        Ok(())
    }
}
