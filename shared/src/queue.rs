//! Fixed-capacity envelope queue between arrival and processing.
//!
//! When full, the incoming envelope is dropped and counted. The queue never
//! blocks and never evicts what it already holds.

use std::collections::VecDeque;

use log::warn;
use serde_json::Value;

/// One inbound unit of routed work.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Transport event kind: `joined`, `leaved` or `game`.
    pub kind: String,
    pub payload: Value,
    pub sender: String,
    pub sequence: u64,
    pub received_at_ms: u64,
}

#[derive(Debug)]
pub struct MessageQueue {
    buffer: VecDeque<Envelope>,
    capacity: usize,
    next_sequence: u64,
    dropped: u64,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
            dropped: 0,
        }
    }

    /// Stamps and enqueues an envelope. Returns false if it was dropped.
    pub fn push(&mut self, kind: &str, payload: Value, sender: &str, now_ms: u64) -> bool {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if self.buffer.len() >= self.capacity {
            self.dropped += 1;
            warn!(
                "Message queue full ({}), dropping {} #{} from {}",
                self.capacity, kind, sequence, sender
            );
            return false;
        }

        self.buffer.push_back(Envelope {
            kind: kind.to_string(),
            payload,
            sender: sender.to_string(),
            sequence,
            received_at_ms: now_ms,
        });
        true
    }

    pub fn pop(&mut self) -> Option<Envelope> {
        self.buffer.pop_front()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Envelopes lost to a full queue since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
