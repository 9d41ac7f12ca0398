// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RemoteReaderProxy -- per-matched-reader state on the writer side
//! (RTPS Sec.8.4.7 ReaderProxy).
//!
//! Tracks which changes a reader still needs (`unsent`), which are in
//! flight awaiting acknowledgement (`unacked`), and which the reader has
//! explicitly NACKed for resend (`requested`). Best-effort writers only use
//! `unsent`; reliable writers drive all three.

use crate::types::{Guid, Locator, SequenceNumber, SequenceNumberSet};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// RTPS Writer state per matched remote reader.
pub struct RemoteReaderProxy {
    pub guid: Guid,
    pub unicast_locators: Vec<Locator>,
    pub multicast_locators: Vec<Locator>,
    /// Locator inferred from the reader's own inbound traffic, preferred
    /// over the announced locators when present.
    pub best_reply_locator: Option<Locator>,
    /// Opaque crypto session handle for payload encryption; `None` means
    /// the association is unprotected.
    pub crypto_handle: Option<u64>,
    pub tunnel: bool,

    unsent: BTreeSet<SequenceNumber>,
    unacked: BTreeSet<SequenceNumber>,
    requested: BTreeSet<SequenceNumber>,

    last_heartbeat_count: u32,
    last_acknack_count: u32,
    last_heartbeat_time: Instant,
    last_seen: Instant,
    lease_duration: Duration,
}

impl RemoteReaderProxy {
    #[must_use]
    pub fn new(guid: Guid, lease_duration: Duration) -> Self {
        let now = Instant::now();
        Self {
            guid,
            unicast_locators: Vec::new(),
            multicast_locators: Vec::new(),
            best_reply_locator: None,
            crypto_handle: None,
            tunnel: false,
            unsent: BTreeSet::new(),
            unacked: BTreeSet::new(),
            requested: BTreeSet::new(),
            last_heartbeat_count: 0,
            last_acknack_count: 0,
            last_heartbeat_time: now,
            last_seen: now,
            lease_duration,
        }
    }

    /// Queue a newly written change for delivery to this reader.
    pub fn queue_change(&mut self, seq: SequenceNumber) {
        self.unsent.insert(seq);
        self.unacked.insert(seq);
    }

    /// Drain and return, in order, the sequence numbers not yet sent.
    pub fn take_unsent(&mut self) -> Vec<SequenceNumber> {
        let seqs: Vec<_> = self.unsent.iter().copied().collect();
        self.unsent.clear();
        seqs
    }

    /// Process an incoming ACKNACK. `count` must strictly increase for the
    /// update to apply (idempotent w.r.t. repeated counts, per RTPS
    /// Sec.8.4.7.3). Returns true if the reader requested a retransmit.
    pub fn on_acknack(&mut self, reader_sn_state: &SequenceNumberSet, count: u32) -> bool {
        self.touch();
        if self.last_acknack_count != 0 && count <= self.last_acknack_count {
            return false;
        }
        self.last_acknack_count = count;

        let base = reader_sn_state.base;
        let missing: BTreeSet<SequenceNumber> = reader_sn_state.members().collect();

        // Anything below base, or at/above base but absent from the
        // bitmap, has been received by the reader.
        self.unacked.retain(|s| *s >= base && missing.contains(s));
        self.unsent.retain(|s| *s >= base);
        self.requested = missing;
        !self.requested.is_empty()
    }

    /// Drain the resend queue built up by [`Self::on_acknack`]; the caller
    /// is responsible for re-emitting DATA for each returned sequence
    /// number. Drained sequences remain tracked in `unacked` until the next
    /// ACKNACK confirms them.
    pub fn take_requested(&mut self) -> Vec<SequenceNumber> {
        let seqs: Vec<_> = self.requested.iter().copied().collect();
        self.requested.clear();
        seqs
    }

    /// Drop a change from all tracking sets, e.g. because the history cache
    /// evicted it.
    pub fn forget(&mut self, seq: SequenceNumber) {
        self.unsent.remove(&seq);
        self.unacked.remove(&seq);
        self.requested.remove(&seq);
    }

    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.unsent.is_empty() && self.unacked.is_empty() && self.requested.is_empty()
    }

    #[must_use]
    pub fn unacked_range(&self) -> Option<(SequenceNumber, SequenceNumber)> {
        let first = *self.unacked.iter().next()?;
        let last = *self.unacked.iter().next_back()?;
        Some((first, last))
    }

    pub fn needs_heartbeat(&self, min_interval: Duration) -> bool {
        self.last_heartbeat_time.elapsed() >= min_interval
    }

    pub fn heartbeat_sent(&mut self) -> u32 {
        self.last_heartbeat_time = Instant::now();
        self.last_heartbeat_count += 1;
        self.last_heartbeat_count
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.last_seen.elapsed() > self.lease_duration.mul_f32(1.5)
    }
}
