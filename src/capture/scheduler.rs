//! Cancellable deadline timers for the capture cycle.
//!
//! Every timed step of a cycle is scheduled here up front, so aborting a
//! cycle is a single `cancel_all`.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Handle to a scheduled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Pending items ordered by deadline, then by scheduling order.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    timers: BTreeMap<(Instant, u64), T>,
    deadlines: HashMap<u64, Instant>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            timers: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Schedule `item` to become due at `at`.
    pub fn schedule(&mut self, at: Instant, item: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.insert((at, id), item);
        self.deadlines.insert(id, at);
        TimerId(id)
    }

    /// Cancel one entry. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id.0) {
            Some(at) => self.timers.remove(&(at, id.0)).is_some(),
            None => false,
        }
    }

    /// Cancel everything pending; returns how many entries were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        self.deadlines.clear();
        count
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return the earliest entry if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        let (at, id) = *self.timers.keys().next()?;
        if at > now {
            return None;
        }
        self.deadlines.remove(&id);
        self.timers.remove(&(at, id))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
