// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RemoteWriterProxy -- per-matched-writer state on the reader side
//! (RTPS Sec.8.4.9 WriterProxy).
//!
//! Tracks the lowest unreceived sequence number and the set of gapped
//! changes up to the highest sequence number heard of, so the reliable
//! reader can emit a correctly-shaped ACKNACK (bitmapBase and Final flag).

use crate::types::{Guid, Locator, SeqRange, SequenceNumber, SequenceNumberSet};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

const ACKNACK_RATE_LIMIT: Duration = Duration::from_millis(10);

/// Outcome of processing an incoming HEARTBEAT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcknackDecision {
    /// Duplicate or stale HEARTBEAT count; no response needed.
    Ignore,
    /// Every change the writer announced has been received.
    Synchronized { bitmap_base: SequenceNumber },
    /// Gaps remain; the bitmap enumerates the missing sequence numbers.
    NeedData { missing: SequenceNumberSet },
    /// An ACKNACK is due but was sent too recently; wait for the next tick.
    RateLimited,
}

/// RTPS Reader state per matched remote writer.
pub struct RemoteWriterProxy {
    pub guid: Guid,
    pub unicast_locators: Vec<Locator>,
    pub multicast_locators: Vec<Locator>,
    pub best_reply_locator: Option<Locator>,
    pub crypto_handle: Option<u64>,
    pub tunnel: bool,

    /// Highest contiguous sequence number delivered so far.
    highest_received: SequenceNumber,
    /// Highest sequence number ever observed, including out-of-order DATA
    /// that arrived ahead of a still-open hole.
    highest_seen: SequenceNumber,
    /// Known holes between `highest_received` and `highest_seen`.
    missing: BTreeSet<SequenceNumber>,
    /// Highest sequence number the writer has announced via HEARTBEAT.
    expected_max: SequenceNumber,
    last_hb_count: u32,
    last_acknack_time: Option<Instant>,
    /// Set when the local history cache is full; the reader stops
    /// acknowledging progress until `inform_end` unblocks it.
    blocked: bool,
}

impl RemoteWriterProxy {
    #[must_use]
    pub fn new(guid: Guid) -> Self {
        Self {
            guid,
            unicast_locators: Vec::new(),
            multicast_locators: Vec::new(),
            best_reply_locator: None,
            crypto_handle: None,
            tunnel: false,
            highest_received: 0,
            highest_seen: 0,
            missing: BTreeSet::new(),
            expected_max: 0,
            last_hb_count: 0,
            last_acknack_time: None,
            blocked: false,
        }
    }

    #[must_use]
    pub fn highest_received(&self) -> SequenceNumber {
        self.highest_received
    }

    /// Record receipt of `seq`. Returns the newly-contiguous tail: sequence
    /// numbers the reader can now deliver to the application in order.
    pub fn on_data(&mut self, seq: SequenceNumber) -> Vec<SequenceNumber> {
        if seq <= self.highest_received {
            return Vec::new();
        }
        if seq > self.highest_seen {
            for s in (self.highest_seen + 1)..seq {
                self.missing.insert(s);
            }
            self.highest_seen = seq;
        } else {
            self.missing.remove(&seq);
        }
        self.advance_contiguous()
    }

    /// Record a GAP covering `range`: those sequence numbers will never
    /// arrive, so they are cleared from `missing` without being delivered.
    /// Returns the newly-contiguous tail, same as [`Self::on_data`].
    pub fn on_gap(&mut self, range: SeqRange) -> Vec<SequenceNumber> {
        for s in range.iter() {
            self.missing.remove(&s);
        }
        self.highest_seen = self.highest_seen.max(range.end.saturating_sub(1));
        self.advance_contiguous()
    }

    fn advance_contiguous(&mut self) -> Vec<SequenceNumber> {
        let mut delivered = Vec::new();
        loop {
            let next = self.highest_received + 1;
            if next > self.highest_seen || self.missing.contains(&next) {
                break;
            }
            self.highest_received = next;
            self.missing.remove(&next);
            delivered.push(next);
        }
        delivered
    }

    /// Process a HEARTBEAT and decide whether/how to respond.
    pub fn on_heartbeat(&mut self, first_seq: SequenceNumber, last_seq: SequenceNumber, count: u32) -> AcknackDecision {
        if count <= self.last_hb_count && self.last_hb_count > 0 {
            return AcknackDecision::Ignore;
        }
        self.last_hb_count = count;
        self.expected_max = last_seq;

        if last_seq < first_seq || last_seq == 0 {
            return AcknackDecision::Synchronized { bitmap_base: first_seq.max(1) };
        }

        if let Some(last_time) = self.last_acknack_time {
            if last_time.elapsed() < ACKNACK_RATE_LIMIT {
                return AcknackDecision::RateLimited;
            }
        }

        if self.highest_received >= last_seq {
            return AcknackDecision::Synchronized { bitmap_base: self.highest_received + 1 };
        }

        let base = (self.highest_received + 1).max(first_seq);
        let mut set = SequenceNumberSet::new(base);
        for s in base..=last_seq {
            if self.missing.contains(&s) || s > self.highest_seen {
                set.add(s);
            }
        }
        AcknackDecision::NeedData { missing: set }
    }

    pub fn mark_acknack_sent(&mut self) {
        self.last_acknack_time = Some(Instant::now());
    }

    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.expected_max > 0 && self.highest_received >= self.expected_max
    }

    pub fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }
}
