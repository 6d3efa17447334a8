//! Thread-safe handoff between the ingress tasks and the tick consumer.
//!
//! These are the only structures touched from both sides. Telemetry goes
//! through an [`OverwriteSlot`] because only the newest reading matters;
//! commands and operator log lines go through a [`fifo`] channel because
//! nothing may be dropped and order matters.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Single-value storage where a new write discards any unread prior value
#[derive(Debug)]
pub struct OverwriteSlot<T> {
    value: Mutex<Option<T>>,
}

impl<T> Default for OverwriteSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OverwriteSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    pub fn publish(&self, value: T) {
        *self.lock() = Some(value);
    }

    /// Reads and clears the slot in one step
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    // The guarded section is a single assignment, so a panic while holding
    // the lock cannot leave a half-written value behind.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates an unbounded FIFO channel with a single consumer
pub fn fifo<T>() -> (FifoSender<T>, FifoReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FifoSender { tx }, FifoReceiver { rx })
}

#[derive(Debug)]
pub struct FifoSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

// Manual impl: deriving would require `T: Clone`.
impl<T> Clone for FifoSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> FifoSender<T> {
    /// Returns false once the consumer is gone
    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

#[derive(Debug)]
pub struct FifoReceiver<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> FifoReceiver<T> {
    /// Yields every queued item in insertion order. Never blocks; an empty
    /// queue yields nothing.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.rx.try_recv().ok())
    }
}
