//! The event log — the single producer/consumer hand-off point.
//!
//! A lock-guarded append/drain buffer. Producers `push` without ever
//! blocking on the consumer; the reconciler `flush`es the whole buffer
//! atomically on its own schedule. Deliberately not a channel: a slow or
//! skipped reconciliation cycle must never back-pressure the producers.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::event::Event;

/// Concurrency-safe append/drain buffer of [`Event`]s.
///
/// Cloning yields another handle to the same buffer; the lock is held only
/// for the duration of an append or a drain, never across I/O.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the tail. Never fails.
    pub fn push(&self, event: Event) {
        let mut events = self.lock();
        events.push(event);
    }

    /// Atomically take every buffered event, in arrival order, and clear
    /// the buffer. Returns an empty vec if nothing was buffered.
    pub fn flush(&self) -> Vec<Event> {
        let mut events = self.lock();
        let drained = std::mem::take(&mut *events);
        trace!(count = drained.len(), "event log drained");
        drained
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        // A poisoned lock only means a producer panicked mid-call; the
        // buffer itself is still a valid Vec, so keep going.
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
