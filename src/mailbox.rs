//! Unbounded lock-free FIFO used as an actor's inbox.
//!
//! A thin named wrapper over [`crossbeam_queue::SegQueue`]. Producers on any
//! thread push; the single logical consumer (the actor's run loop) pops.
//! Messages from one producer are delivered in the order that producer pushed
//! them; messages from different producers interleave in arrival order.

use crossbeam_queue::SegQueue;
use std::fmt;

/// Multi-producer FIFO message queue.
pub struct Mailbox<M> {
    queue: SegQueue<M>,
}

impl<M> Mailbox<M> {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    /// Enqueues a message. Never blocks.
    pub fn push(&self, message: M) {
        self.queue.push(message);
    }

    /// Dequeues the oldest message, or `None` when the mailbox is empty.
    pub fn pop(&self) -> Option<M> {
        self.queue.pop()
    }

    /// Number of queued messages. A snapshot; concurrent pushes and pops may
    /// change it immediately.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the mailbox is currently empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<M> Default for Mailbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Mailbox<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").field("len", &self.len()).finish()
    }
}
