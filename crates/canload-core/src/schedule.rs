#![forbid(unsafe_code)]

//! Host-driven deadline queue.
//!
//! The loader never sleeps or owns a timer. It records deadlines here; the
//! host asks for [`next_deadline`](Schedule::next_deadline), arranges a
//! wake-up however it likes, and then drains due entries with
//! [`pop_due`](Schedule::pop_due). Entries with equal deadlines fire in
//! insertion order.

use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry<K> {
    at: Duration,
    seq: u64,
    kind: K,
}

/// Small ordered set of pending deadlines keyed by `K`.
#[derive(Debug, Clone)]
pub struct Schedule<K> {
    entries: Vec<Entry<K>>,
    next_seq: u64,
}

impl<K> Default for Schedule<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<K: Copy + PartialEq> Schedule<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `kind` once the clock reaches `at`.
    pub fn at(&mut self, at: Duration, kind: K) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { at, seq, kind });
    }

    /// Drop every pending entry of `kind`. Returns whether any existed.
    pub fn cancel(&mut self, kind: K) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.kind != kind);
        self.entries.len() != before
    }

    /// Drop every pending entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_scheduled(&self, kind: K) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.at).min()
    }

    /// Remove and return the earliest entry due at `now`, if any.
    pub fn pop_due(&mut self, now: Duration) -> Option<K> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.at <= now)
            .min_by_key(|(_, e)| (e.at, e.seq))
            .map(|(i, _)| i)?;
        Some(self.entries.remove(idx).kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
