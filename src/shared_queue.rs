//! Thread-safe call queue with blocking and non-blocking producers/consumers.

use std::sync::{Condvar, Mutex};

use tracing::debug;

use crate::call_queue::{CallQueue, QueueError};
use crate::types::Call;

/// A [`CallQueue`] guarded by a single mutex, so every operation observes
/// and updates the cursors and slots together.
pub struct SharedCallQueue {
    inner: Mutex<SharedState>,
    available: Condvar,
    space: Condvar,
}

struct SharedState {
    queue: CallQueue,
    closed: bool,
}

impl SharedCallQueue {
    /// Create an empty shared queue with room for `capacity` calls.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Ok(Self {
            inner: Mutex::new(SharedState {
                queue: CallQueue::new(capacity)?,
                closed: false,
            }),
            available: Condvar::new(),
            space: Condvar::new(),
        })
    }

    /// Push without waiting; a full queue returns the call as an overflow.
    #[allow(dead_code)]
    pub fn try_push(&self, call: Call) -> Result<(), QueueError> {
        let mut guard = self.inner.lock().expect("call queue mutex poisoned");
        if guard.closed {
            return Err(QueueError::Closed(call));
        }
        guard.queue.enqueue(call)?;
        self.available.notify_one();
        Ok(())
    }

    /// Block until there is room for `call` or the queue is closed.
    ///
    /// Returns how many times the push found the queue full before it fit.
    pub fn push_blocking(&self, call: Call) -> Result<usize, QueueError> {
        let mut guard = self.inner.lock().expect("call queue mutex poisoned");
        let mut retries = 0;
        loop {
            if guard.closed {
                return Err(QueueError::Closed(call));
            }
            if !guard.queue.is_full() {
                guard.queue.enqueue(call)?;
                self.available.notify_one();
                return Ok(retries);
            }
            retries += 1;
            guard = self.space.wait(guard).expect("condvar wait failed");
        }
    }

    /// Try to pop immediately without blocking.
    #[allow(dead_code)]
    pub fn try_pop(&self) -> Result<Call, QueueError> {
        let mut guard = self.inner.lock().expect("call queue mutex poisoned");
        let call = guard.queue.dequeue()?;
        self.space.notify_one();
        Ok(call)
    }

    /// Block until a call is available or the queue is closed and drained.
    pub fn pop_blocking_or_closed(&self) -> Option<Call> {
        let mut guard = self.inner.lock().expect("call queue mutex poisoned");
        loop {
            if !guard.queue.is_empty() {
                if let Ok(call) = guard.queue.dequeue() {
                    self.space.notify_one();
                    return Some(call);
                }
            }
            if guard.closed {
                return None;
            }
            // Wait releases the lock and re-acquires it before returning.
            guard = self.available.wait(guard).expect("condvar wait failed");
        }
    }

    /// Reorder the waiting calls so urgent ones are served first.
    pub fn prioritize_urgent_calls(&self) -> usize {
        let mut guard = self.inner.lock().expect("call queue mutex poisoned");
        guard.queue.prioritize_urgent_calls()
    }

    /// Close the queue and wake every blocked producer and consumer.
    pub fn close(&self) {
        let mut guard = self.inner.lock().expect("call queue mutex poisoned");
        guard.closed = true;
        debug!(remaining = guard.queue.len(), "shared call queue closed");
        self.available.notify_all();
        self.space.notify_all();
    }

    /// Current number of queued calls.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("call queue mutex poisoned");
        guard.queue.len()
    }

    /// Copy of the waiting calls, front first.
    #[allow(dead_code)]
    pub fn snapshot(&self) -> Vec<Call> {
        let guard = self.inner.lock().expect("call queue mutex poisoned");
        guard.queue.iter().copied().collect()
    }
}
