//! Fixed-capacity circular queue of calls with a stable urgent-first reorder.
//!
//! The queue owns a backing array of `capacity` slots and an occupied window
//! `front..=rear` that advances modulo the capacity. An empty queue has no
//! window at all, so "front is unset iff rear is unset" holds by construction.

use std::iter::FusedIterator;

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{Call, CallId, CallType};

/// Recoverable queue conditions. None of them disturb the queue state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue capacity must be greater than zero")]
    ZeroCapacity,

    /// The queue was full; the rejected call is handed back and not stored.
    #[error("queue overflow, cannot enqueue call {}", .0.id)]
    Overflow(Call),

    #[error("queue underflow, cannot dequeue call")]
    Underflow,

    /// Only produced by the shared wrapper once it has been closed.
    #[error("queue closed, cannot enqueue call {}", .0.id)]
    Closed(Call),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Window {
    front: usize,
    rear: usize,
}

/// Bounded circular queue of [`Call`] records.
#[derive(Clone, Debug)]
pub struct CallQueue {
    slots: Vec<Call>,
    window: Option<Window>,
}

impl CallQueue {
    /// Create an empty queue with room for `capacity` calls.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            slots: vec![Call::default(); capacity],
            window: None,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        match self.window {
            None => 0,
            Some(Window { front, rear }) if front <= rear => rear - front + 1,
            Some(Window { front, rear }) => self.capacity() - front + rear + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_none()
    }

    /// Full when stepping `rear` once more would land on `front`.
    ///
    /// An empty queue has no `front` to collide with, so the window starts at
    /// slot 0 and the queue holds exactly `capacity` calls before it reports
    /// full.
    pub fn is_full(&self) -> bool {
        self.window.is_some_and(|w| self.advance(w.rear) == w.front)
    }

    /// Oldest call in the queue, if any.
    #[allow(dead_code)]
    pub fn peek(&self) -> Option<&Call> {
        self.window.map(|w| &self.slots[w.front])
    }

    /// Append `call` at the rear.
    pub fn enqueue(&mut self, call: Call) -> Result<CallId, QueueError> {
        if self.is_full() {
            warn!(
                call_id = call.id,
                capacity = self.capacity(),
                "queue overflow, call dropped"
            );
            return Err(QueueError::Overflow(call));
        }

        let window = match self.window {
            None => Window { front: 0, rear: 0 },
            Some(w) => Window {
                front: w.front,
                rear: self.advance(w.rear),
            },
        };
        self.slots[window.rear] = call;
        self.window = Some(window);
        debug!(call_id = call.id, slot = window.rear, len = self.len(), "enqueued call");
        Ok(call.id)
    }

    /// Remove and return the call at the front.
    ///
    /// The slot keeps its old contents; it is only dropped from the window.
    pub fn dequeue(&mut self) -> Result<Call, QueueError> {
        let Some(w) = self.window else {
            warn!("queue underflow, nothing to dequeue");
            return Err(QueueError::Underflow);
        };

        let call = self.slots[w.front];
        self.window = if w.front == w.rear {
            None
        } else {
            Some(Window {
                front: self.advance(w.front),
                rear: w.rear,
            })
        };
        debug!(call_id = call.id, slot = w.front, len = self.len(), "dequeued call");
        Ok(call)
    }

    /// Walk the occupied slots from front to rear, wrapping as needed.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: &self.slots,
            next: self.window.map_or(0, |w| w.front),
            remaining: self.len(),
        }
    }

    /// Move every urgent call ahead of every normal call.
    ///
    /// Both groups keep their relative order. The reordered calls are written
    /// back starting at slot 0, so the window always restarts at 0 afterwards.
    /// Returns the number of urgent calls now at the head of the queue.
    pub fn prioritize_urgent_calls(&mut self) -> usize {
        if self.is_empty() {
            return 0;
        }

        let mut reordered: Vec<Call> = Vec::with_capacity(self.len());
        reordered.extend(self.iter().filter(|call| call.kind == CallType::Urgent));
        let urgent = reordered.len();
        reordered.extend(self.iter().filter(|call| call.kind == CallType::Normal));

        let count = reordered.len();
        self.slots[..count].copy_from_slice(&reordered);
        self.window = Some(Window {
            front: 0,
            rear: count - 1,
        });
        debug!(urgent, normal = count - urgent, "prioritized urgent calls");
        urgent
    }

    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.capacity()
    }
}

impl<'a> IntoIterator for &'a CallQueue {
    type Item = &'a Call;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Front-to-rear traversal of a [`CallQueue`].
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    slots: &'a [Call],
    next: usize,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Call;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let call = &self.slots[self.next];
        self.next = (self.next + 1) % self.slots.len();
        self.remaining -= 1;
        Some(call)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}
