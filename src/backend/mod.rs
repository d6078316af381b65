//! Storage backend interface
//!
//! The pipeline's downstream consumers persist what they process into a
//! kind-addressed, write-once object store. This module defines that
//! store's contract; implementations live in [`local`] and [`memory`].
//!
//! Objects are addressed by [`Kind`] plus name, except the configuration
//! object, which is addressed by kind alone. All objects live under a
//! fixed namespace prefix so a shared store never collides with
//! unrelated data.
//!
//! Writes are serialized through a fixed-size slot pool ([`ConnSlots`])
//! to bound the number of connections a backend holds open at once.

pub mod local;
pub mod memory;

pub use local::LocalBackend;
pub use memory::MemoryBackend;

use crossbeam_channel::{bounded, Receiver, Sender};
use std::fmt;
use std::io::{Read, Write};

use crate::cancel::{cancellation, CancelSignal};
use crate::error::BackendResult;

/// Namespace prefix under which every object is stored.
pub const NAMESPACE_PREFIX: &str = "backup";

/// Default number of concurrent write slots per backend.
pub const DEFAULT_WRITE_SLOTS: usize = 10;

/// Object category. The set is closed; every object in a store belongs
/// to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// Content chunks
    Data,
    /// Encryption keys
    Key,
    /// Repository locks
    Lock,
    /// Snapshot descriptors
    Snapshot,
    /// Index objects
    Index,
    /// The single repository configuration object, addressed without a name
    Config,
}

impl Kind {
    /// Every kind, in listing order.
    pub const ALL: [Kind; 6] = [
        Kind::Data,
        Kind::Key,
        Kind::Lock,
        Kind::Snapshot,
        Kind::Index,
        Kind::Config,
    ];

    /// Directory-name representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Data => "data",
            Kind::Key => "key",
            Kind::Lock => "lock",
            Kind::Snapshot => "snapshot",
            Kind::Index => "index",
            Kind::Config => "config",
        }
    }

    /// Whether objects of this kind carry individual names.
    pub fn has_names(self) -> bool {
        !matches!(self, Kind::Config)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A write-once object in the making.
///
/// Data written is buffered in memory and becomes visible only when
/// [`finalize`](Blob::finalize) commits it under a kind and name.
/// Dropping an unfinalized blob discards it.
pub trait Blob: Write + Send {
    /// Number of bytes buffered so far.
    fn len(&self) -> u64;

    /// True when nothing has been written yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commit the buffered data under `kind`/`name`. Fails with
    /// `AlreadyExists` when the name is taken; the store is never
    /// overwritten.
    fn finalize(self: Box<Self>, kind: Kind, name: &str) -> BackendResult<()>;
}

/// A kind-addressed, write-once object store.
///
/// The `name` parameter is ignored for [`Kind::Config`]; pass an empty
/// string.
pub trait Backend: Send + Sync {
    /// Human-readable location of the store (path, bucket, ...).
    fn location(&self) -> String;

    /// Open a new blob. Data is committed by [`Blob::finalize`].
    fn create(&self) -> BackendResult<Box<dyn Blob>>;

    /// Stream the content stored under `kind`/`name`.
    fn get(&self, kind: Kind, name: &str) -> BackendResult<Box<dyn Read + Send>>;

    /// Stream a byte range of the object. `length == 0` reads to the end.
    /// Fails when `offset` lies past the end of the object.
    fn get_ranged(
        &self,
        kind: Kind,
        name: &str,
        offset: u64,
        length: u64,
    ) -> BackendResult<Box<dyn Read + Send>>;

    /// Existence check. `Ok(false)` means confirmed absent; transport
    /// failures surface as `Err`, never as a false negative.
    fn test(&self, kind: Kind, name: &str) -> BackendResult<bool>;

    /// Remove the object. Fails with `NotFound` when it does not exist.
    fn remove(&self, kind: Kind, name: &str) -> BackendResult<()>;

    /// Produce all names of the given kind, sorted. The producer closes
    /// the stream when drained or when `cancel` fires. [`Kind::Config`]
    /// yields no names.
    fn list(&self, kind: Kind, cancel: CancelSignal) -> Receiver<String>;

    /// Remove every object in the store, iterating each kind's own
    /// listing.
    fn delete_all(&self) -> BackendResult<()> {
        for kind in Kind::ALL {
            if !kind.has_names() {
                if self.test(kind, "")? {
                    self.remove(kind, "")?;
                }
                continue;
            }

            // Collect before removing so the listing is not pulled out
            // from under the producer.
            let (_token, signal) = cancellation();
            let names: Vec<String> = self.list(kind, signal).iter().collect();
            for name in names {
                self.remove(kind, &name)?;
            }
        }
        Ok(())
    }
}

/// Fixed-size pool of write slots.
///
/// A token is taken for the duration of each write operation, bounding
/// how many writes a backend runs at once. Tokens return on guard drop.
#[derive(Debug)]
pub struct ConnSlots {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl ConnSlots {
    /// Create a pool holding `slots` tokens.
    pub fn new(slots: usize) -> Self {
        let (tx, rx) = bounded(slots);
        for _ in 0..slots {
            let _ = tx.send(());
        }
        Self { tx, rx }
    }

    /// Take a slot, blocking until one is free.
    pub fn acquire(&self) -> SlotGuard<'_> {
        let _ = self.rx.recv();
        SlotGuard { slots: self }
    }
}

impl Default for ConnSlots {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_SLOTS)
    }
}

/// RAII guard returning its slot to the pool on drop
pub struct SlotGuard<'a> {
    slots: &'a ConnSlots,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let _ = self.slots.tx.send(());
    }
}
