// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stateless writer variants: no per-reader `ReaderProxy`, delivery is to a
//! fixed set of destination locators (SPDP's own writer is the canonical
//! user of this variant — it addresses the multicast group, not specific
//! discovered readers).

use crate::cache::Change;
use crate::types::{Locator, SequenceNumber};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// `StatelessBestEffortWriter`: `new_change` queues, `send_now` drains; no
/// acknowledgement tracking of any kind.
#[derive(Default)]
pub struct StatelessBestEffortWriter {
    destinations: Mutex<Vec<Locator>>,
    unsent: Mutex<VecDeque<Arc<Change>>>,
}

impl StatelessBestEffortWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, locators: Vec<Locator>) {
        *self.destinations.lock() = locators;
    }

    #[must_use]
    pub fn destinations(&self) -> Vec<Locator> {
        self.destinations.lock().clone()
    }

    pub fn new_change(&self, change: Arc<Change>) {
        self.unsent.lock().push_back(change);
    }

    /// Drain every queued change; the caller builds and sends one DATA
    /// submessage per entry to every destination locator.
    pub fn send_now(&self) -> Vec<Arc<Change>> {
        self.unsent.lock().drain(..).collect()
    }

    pub fn rem_change(&self, seq: SequenceNumber) {
        self.unsent.lock().retain(|c| c.seq != seq);
    }

    pub fn finish(&self) {
        self.destinations.lock().clear();
        self.unsent.lock().clear();
    }
}

/// `StatelessReliableWriter`: as above, but `start` arms a periodic resend
/// timer and changes are retried until the per-sequence retry ceiling is
/// reached. Rarely exercised in practice (most reliable writers are
/// stateful), but implemented fully rather than stubbed since it shares the
/// same queue/retry mechanics either way.
pub struct StatelessReliableWriter {
    destinations: Mutex<Vec<Locator>>,
    unsent: Mutex<VecDeque<Arc<Change>>>,
    /// Sent but unacknowledged — stateless writers have no ACKNACK to clear
    /// this, so entries age out via the retry ceiling in [`Self::poll_resend`].
    unacked: Mutex<HashMap<SequenceNumber, Arc<Change>>>,
    retries: Mutex<HashMap<SequenceNumber, u32>>,
    period: Duration,
    max_retries: u32,
    next_deadline: Mutex<Instant>,
}

impl StatelessReliableWriter {
    #[must_use]
    pub fn new(period: Duration, max_retries: u32) -> Self {
        Self {
            destinations: Mutex::new(Vec::new()),
            unsent: Mutex::new(VecDeque::new()),
            unacked: Mutex::new(HashMap::new()),
            retries: Mutex::new(HashMap::new()),
            period,
            max_retries,
            next_deadline: Mutex::new(Instant::now() + period),
        }
    }

    pub fn start(&self, locators: Vec<Locator>) {
        *self.destinations.lock() = locators;
        *self.next_deadline.lock() = Instant::now() + self.period;
    }

    #[must_use]
    pub fn destinations(&self) -> Vec<Locator> {
        self.destinations.lock().clone()
    }

    pub fn new_change(&self, change: Arc<Change>) {
        self.unsent.lock().push_back(change);
    }

    pub fn send_now(&self) -> Vec<Arc<Change>> {
        let drained: Vec<_> = self.unsent.lock().drain(..).collect();
        let mut unacked = self.unacked.lock();
        for c in &drained {
            unacked.insert(c.seq, Arc::clone(c));
        }
        drained
    }

    /// If the resend deadline has passed, return every still-unacked change
    /// to retransmit, dropping any that have exhausted `max_retries`.
    pub fn poll_resend(&self, now: Instant) -> Vec<Arc<Change>> {
        let mut deadline = self.next_deadline.lock();
        if now < *deadline {
            return Vec::new();
        }
        *deadline = now + self.period;
        drop(deadline);

        let mut unacked = self.unacked.lock();
        let mut retries = self.retries.lock();
        let mut due = Vec::new();
        unacked.retain(|seq, change| {
            let count = retries.entry(*seq).or_insert(0);
            if *count >= self.max_retries {
                retries.remove(seq);
                return false;
            }
            *count += 1;
            due.push(Arc::clone(change));
            true
        });
        due
    }

    pub fn rem_change(&self, seq: SequenceNumber) {
        self.unsent.lock().retain(|c| c.seq != seq);
        self.unacked.lock().remove(&seq);
        self.retries.lock().remove(&seq);
    }

    pub fn finish(&self) {
        self.destinations.lock().clear();
        self.unsent.lock().clear();
        self.unacked.lock().clear();
        self.retries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ChangeKind;
    use crate::types::Guid;
    use std::time::SystemTime;

    fn change(seq: u64) -> Arc<Change> {
        Arc::new(Change::new(
            ChangeKind::Alive,
            Guid::unknown(),
            seq,
            [0u8; 16],
            SystemTime::now(),
            Arc::from(&b"x"[..]),
        ))
    }

    #[test]
    fn best_effort_drains_in_order_with_no_ack_tracking() {
        let w = StatelessBestEffortWriter::new();
        w.new_change(change(1));
        w.new_change(change(2));
        let sent: Vec<_> = w.send_now().iter().map(|c| c.seq).collect();
        assert_eq!(sent, vec![1, 2]);
        assert!(w.send_now().is_empty());
    }

    #[test]
    fn reliable_resend_respects_retry_ceiling() {
        let w = StatelessReliableWriter::new(Duration::from_millis(0), 2);
        w.new_change(change(1));
        w.send_now();

        let t0 = Instant::now();
        assert_eq!(w.poll_resend(t0 + Duration::from_millis(1)).len(), 1, "first retry");
        assert_eq!(w.poll_resend(t0 + Duration::from_millis(2)).len(), 1, "second retry");
        // max_retries=2 exhausted: the change is dropped, not retried a third time.
        assert!(w.poll_resend(t0 + Duration::from_millis(3)).is_empty());
    }

    #[test]
    fn rem_change_clears_all_tracking() {
        let w = StatelessReliableWriter::new(Duration::from_secs(1), 5);
        w.new_change(change(1));
        w.send_now();
        w.rem_change(1);
        assert!(w.poll_resend(Instant::now() + Duration::from_secs(2)).is_empty());
    }

    #[test]
    fn best_effort_rem_change_drops_from_unsent() {
        let w = StatelessBestEffortWriter::new();
        w.new_change(change(1));
        w.new_change(change(2));
        w.rem_change(1);
        let sent: Vec<_> = w.send_now().iter().map(|c| c.seq).collect();
        assert_eq!(sent, vec![2]);
    }
}
