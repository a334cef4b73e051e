//! Fixed-capacity append-only log with FIFO eviction

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct CappedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> CappedLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Build from stored entries (oldest first), keeping only the newest `capacity`
    pub fn from_entries(entries: Vec<T>, capacity: usize) -> Self {
        let mut log = Self::new(capacity);
        for entry in entries {
            log.push(entry);
        }
        log
    }

    /// Append; returns the evicted oldest entry when full
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Drop the `count` oldest entries
    pub fn trim_oldest(&mut self, count: usize) -> usize {
        let count = count.min(self.entries.len());
        self.entries.drain(..count);
        count
    }

    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }
}

impl<T: Serialize> Serialize for CappedLog<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}
