//! One-shot cancellation broadcast
//!
//! Shutdown is signalled by *closing* a channel, never by sending on it.
//! Closing reaches every signal clone at once, and a closed channel is
//! selectable, so a task blocked on a channel send can wait on the signal
//! at the same time. An atomic flag cannot unpark a blocked send, which is
//! why the signal is a channel endpoint rather than an `AtomicBool`.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};

/// Create a linked cancellation token and signal.
///
/// The token side requests shutdown; the signal side observes it. Signals
/// are cheap to clone, one per task.
pub fn cancellation() -> (CancelToken, CancelSignal) {
    // Capacity zero: even a stray send could never complete unobserved.
    let (tx, rx) = bounded::<()>(0);
    (
        CancelToken {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        CancelSignal { rx },
    )
}

/// Requests shutdown by disconnecting every [`CancelSignal`].
///
/// Clones share the underlying channel: any clone may call
/// [`cancel`](CancelToken::cancel), and dropping the last clone cancels
/// implicitly, so a traversal can never outlive its owner.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl CancelToken {
    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Observes a shutdown request.
///
/// `recv` on the inner channel completes only when the token side has
/// disconnected, which makes the signal usable inside `select!` arms.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Receiver<()>,
}

impl CancelSignal {
    /// Non-blocking poll of the signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block until cancellation fires.
    pub fn wait(&self) {
        let _ = self.rx.recv();
    }

    /// The raw channel endpoint, for use in `select!` arms.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}
