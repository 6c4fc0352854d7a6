// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("FIFO is full ({capacity} entries)")]
pub struct FifoFull {
    pub capacity: usize,
}

/// Result of offering an incoming entry to a receive FIFO.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delivery {
    Stored,
    /// Entry dropped. `first` is true on the transition into overrun.
    Overrun { first: bool },
}

/// Bounded queue with a trigger threshold and a sticky overrun flag.
#[derive(Clone, Debug)]
pub struct Fifo<T> {
    capacity: usize,
    threshold: usize,
    overrun: bool,
    buf: VecDeque<T>,
}

impl<T> Fifo<T> {
    pub fn new(capacity: usize, threshold: usize) -> Self {
        debug_assert!(threshold <= capacity);
        Fifo {
            capacity,
            threshold,
            overrun: false,
            buf: VecDeque::new(),
        }
    }

    /// Append for transmit. Fails only when the fixed capacity is reached.
    pub fn push(&mut self, item: T) -> Result<(), FifoFull> {
        if self.is_full() {
            return Err(FifoFull { capacity: self.capacity });
        }
        self.buf.push_back(item);
        Ok(())
    }

    /// Append on receipt. When full, the item is discarded and the sticky
    /// overrun flag is set.
    pub fn deliver(&mut self, item: T) -> Delivery {
        if self.is_full() {
            let first = !self.overrun;
            self.overrun = true;
            Delivery::Overrun { first }
        } else {
            self.buf.push_back(item);
            Delivery::Stored
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.buf.pop_front()
    }

    pub fn overrun(&self) -> bool {
        self.overrun
    }

    /// Report and clear the overrun flag, as a status read does.
    pub fn take_overrun(&mut self) -> bool {
        std::mem::take(&mut self.overrun)
    }

    /// Change depth and trigger level. Contents are discarded.
    pub fn reconfigure(&mut self, capacity: usize, threshold: usize) {
        debug_assert!(threshold <= capacity);
        self.capacity = capacity;
        self.threshold = threshold;
        self.buf.clear();
    }

    /// Drop contents. The overrun flag is left for the status read.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.overrun = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn threshold(&self) -> usize {
        self.threshold
    }
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }
    /// Occupancy has reached the trigger level.
    pub fn at_threshold(&self) -> bool {
        self.buf.len() >= self.threshold
    }
}
