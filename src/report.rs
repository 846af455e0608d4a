//! Presentation of queue outcomes. The queue returns structured results and
//! a reporter decides how they are shown.

use std::io::{self, Write};

use crate::call_queue::{CallQueue, QueueError};
use crate::types::{Call, CallId};

/// Sink for the outcome of each queue operation.
pub trait QueueReporter {
    /// Title for the listing that follows.
    fn heading(&mut self, title: &str) -> io::Result<()>;
    fn enqueued(&mut self, outcome: &Result<CallId, QueueError>) -> io::Result<()>;
    fn dequeued(&mut self, outcome: &Result<Call, QueueError>) -> io::Result<()>;
    /// Every waiting call, front first.
    fn listing(&mut self, queue: &CallQueue) -> io::Result<()>;
}

/// Plain-text console transcript, one line per event.
pub struct TranscriptReporter<W: Write> {
    out: W,
}

impl<W: Write> TranscriptReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[allow(dead_code)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn error_line(&mut self, err: &QueueError) -> io::Result<()> {
        match err {
            QueueError::Overflow(_) => writeln!(self.out, "Queue Overflow! Cannot enqueue call."),
            QueueError::Underflow => writeln!(self.out, "Queue Underflow! Cannot dequeue call."),
            other => writeln!(self.out, "Queue error: {other}"),
        }
    }
}

impl<W: Write> QueueReporter for TranscriptReporter<W> {
    fn heading(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out, "{title}:")
    }

    fn enqueued(&mut self, outcome: &Result<CallId, QueueError>) -> io::Result<()> {
        match outcome {
            Ok(id) => writeln!(self.out, "Enqueued Call ID: {id}"),
            Err(err) => self.error_line(err),
        }
    }

    fn dequeued(&mut self, outcome: &Result<Call, QueueError>) -> io::Result<()> {
        match outcome {
            Ok(call) => writeln!(self.out, "Dequeued Call ID: {}", call.id),
            Err(err) => self.error_line(err),
        }
    }

    fn listing(&mut self, queue: &CallQueue) -> io::Result<()> {
        if queue.is_empty() {
            writeln!(self.out, "Queue is empty.")?;
        } else {
            for call in queue {
                writeln!(self.out, "{call}")?;
            }
        }
        writeln!(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(reporter: TranscriptReporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).expect("utf8 transcript")
    }

    #[test]
    fn renders_enqueue_and_overflow() {
        let mut queue = CallQueue::new(1).expect("capacity");
        let mut reporter = TranscriptReporter::new(Vec::new());
        let first = queue.enqueue(Call::normal(1, 10, false));
        reporter.enqueued(&first).expect("write");
        let second = queue.enqueue(Call::urgent(2, 5, true));
        reporter.enqueued(&second).expect("write");
        assert_eq!(
            rendered(reporter),
            "Enqueued Call ID: 1\nQueue Overflow! Cannot enqueue call.\n"
        );
    }

    #[test]
    fn renders_dequeue_and_underflow() {
        let mut queue = CallQueue::new(2).expect("capacity");
        queue.enqueue(Call::urgent(4, 8, true)).expect("room");
        let mut reporter = TranscriptReporter::new(Vec::new());
        let first = queue.dequeue();
        reporter.dequeued(&first).expect("write");
        let second = queue.dequeue();
        reporter.dequeued(&second).expect("write");
        assert_eq!(
            rendered(reporter),
            "Dequeued Call ID: 4\nQueue Underflow! Cannot dequeue call.\n"
        );
    }

    #[test]
    fn renders_listing_or_empty_notice() {
        let mut queue = CallQueue::new(3).expect("capacity");
        let mut reporter = TranscriptReporter::new(Vec::new());
        reporter.heading("Initial Queue").expect("write");
        reporter.listing(&queue).expect("write");
        queue.enqueue(Call::normal(1, 10, false)).expect("room");
        queue.enqueue(Call::urgent(2, 5, true)).expect("room");
        reporter.listing(&queue).expect("write");
        assert_eq!(
            rendered(reporter),
            "Initial Queue:\n\
             Queue is empty.\n\
             \n\
             Call ID: 1, Type: NORMAL, Duration: 10, Callback Requested: No\n\
             Call ID: 2, Type: URGENT, Duration: 5, Callback Requested: Yes\n\
             \n"
        );
    }
}
