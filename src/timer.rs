// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Absolute-time timer wheel driving the guard subsystem and the
//! reliability heartbeat/NACK-suppression timers.
//!
//! Entries are kept in a `BinaryHeap` ordered by the earliest deadline, one
//! heap per [`TimerWheel`] (the engine runs one wheel per core-thread event
//! loop, per SPEC_FULL.md §5). `poll_expired` is the only mutating entry
//! point the event loop needs to call once per iteration.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Opaque handle identifying a scheduled timer entry, returned by
/// [`TimerWheel::schedule`] so callers can [`TimerWheel::cancel`] it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Whether an expired entry should be rescheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Once,
    Every(Duration),
}

struct Entry<T> {
    id: TimerId,
    deadline: Instant,
    recurrence: Recurrence,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}
impl<T> Eq for Entry<T> {}
impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so the heap is a min-heap on deadline.
        other.deadline.cmp(&self.deadline)
    }
}

/// A min-heap of absolute-time one-shot or periodic timers.
///
/// `T` is caller-chosen payload identifying what fired (e.g. a guard id or a
/// proxy GUID); the wheel itself is agnostic to what the timer means.
pub struct TimerWheel<T> {
    entries: BinaryHeap<Entry<T>>,
    next_id: u64,
}

impl<T> Default for TimerWheel<T> {
    fn default() -> Self {
        Self { entries: BinaryHeap::new(), next_id: 0 }
    }
}

impl<T: Clone> TimerWheel<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire at `deadline`, optionally recurring.
    pub fn schedule(&mut self, deadline: Instant, recurrence: Recurrence, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, deadline, recurrence, payload });
        id
    }

    /// Schedule `payload` to fire after `delay` from now.
    pub fn schedule_after(&mut self, delay: Duration, recurrence: Recurrence, payload: T) -> TimerId {
        self.schedule(Instant::now() + delay, recurrence, payload)
    }

    /// Cancel a pending timer. No-op if it already fired or was never
    /// scheduled; the entry is lazily dropped the next time it would have
    /// been popped (cheaper than a linear scan of the heap on every cancel).
    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Instant of the next pending deadline, if any. The event loop can use
    /// this to size its poll/select timeout.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.peek().map(|e| e.deadline)
    }

    /// Pop and return every entry whose deadline has passed as of `now`,
    /// rescheduling periodic entries for their next occurrence.
    pub fn poll_expired(&mut self, now: Instant) -> Vec<T> {
        let mut fired = Vec::new();
        while let Some(top) = self.entries.peek() {
            if top.deadline > now {
                break;
            }
            let Entry { id, recurrence, payload, .. } = self.entries.pop().unwrap();
            if let Recurrence::Every(period) = recurrence {
                self.entries.push(Entry {
                    id,
                    deadline: now + period,
                    recurrence,
                    payload: payload.clone(),
                });
            }
            fired.push(payload);
        }
        fired
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
