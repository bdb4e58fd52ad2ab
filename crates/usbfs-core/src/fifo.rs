//! Bounded byte FIFOs backing the endpoint buffers.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A byte FIFO with a fixed capacity and an uncommitted tail.
///
/// The OUT path fills the FIFO while the CRC16 check is still running; the
/// bytes of the packet in flight stay uncommitted so a checksum failure can
/// roll the whole packet back without disturbing anything the host has not
/// yet drained. Readers only ever see committed bytes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ByteFifo {
    buf: VecDeque<u8>,
    capacity: usize,
    pending: usize,
}

impl ByteFifo {
    pub fn new(capacity: usize) -> ByteFifo {
        ByteFifo {
            buf: VecDeque::with_capacity(capacity),
            capacity,
            pending: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Committed bytes available to a reader.
    pub fn len(&self) -> usize {
        self.buf.len() - self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    /// Append a committed byte. Returns `false` if the FIFO was full and the
    /// byte was dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buf.insert(self.buf.len() - self.pending, byte);
        true
    }

    /// Append an uncommitted byte, invisible to readers until [`commit`].
    ///
    /// [`commit`]: ByteFifo::commit
    pub fn push_pending(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buf.push_back(byte);
        self.pending += 1;
        true
    }

    /// Make all pending bytes visible to readers.
    pub fn commit(&mut self) {
        self.pending = 0;
    }

    /// Drop all pending bytes.
    pub fn rollback(&mut self) {
        for _ in 0..self.pending {
            self.buf.pop_back();
        }
        self.pending = 0;
    }

    /// Next committed byte without consuming it.
    pub fn front(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            self.buf.front().copied()
        }
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            self.buf.pop_front()
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.pending = 0;
    }
}
