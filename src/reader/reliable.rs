// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reliable reader: tracks a `missing` set per matched writer via
//! [`RemoteWriterProxy`], and coalesces ACKNACKs behind a response-delay
//! timer. The coalescing/backoff shape is grounded on the teacher's
//! `NackScheduler` (20ms window, 5-retry exponential backoff), generalized
//! from one flat scheduler into one instance per matched writer so a slow
//! writer doesn't pace ACKNACKs to every other matched writer.

use crate::cache::{Change, ChangeKind, HistoryCache};
use crate::config::{HEARTBEAT_RESPONSE_DELAY_MS, PARTICIPANT_LEASE_DURATION_MS};
use crate::error::Result;
use crate::message::{AcknackSubmessage, DataFragSubmessage, GapSubmessage, HeartbeatSubmessage, NackFragSubmessage};
use crate::proxy::{AcknackDecision, RemoteWriterProxy};
use crate::reader::fragment::FragmentReassembler;
use crate::types::{EntityId, Guid, InstanceHandle, SeqRange, SequenceNumber, SequenceNumberSet};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

const MAX_RETRIES: u8 = 5;
const INITIAL_BACKOFF_MS: u64 = 50;

struct ReliableProxy {
    writer: RemoteWriterProxy,
    /// Bitmap to send next, captured at the HEARTBEAT that armed the timer.
    pending: Option<SequenceNumberSet>,
    next_flush: Option<Instant>,
    retry_count: u8,
    backoff: Duration,
    acknack_count: u32,
    nack_frag_count: u32,
    last_seen: Instant,
    lease_duration: Duration,
    reassembler: FragmentReassembler,
}

impl ReliableProxy {
    fn new(guid: Guid, lease_duration: Duration) -> Self {
        Self {
            writer: RemoteWriterProxy::new(guid),
            pending: None,
            next_flush: None,
            retry_count: 0,
            backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            acknack_count: 0,
            nack_frag_count: 0,
            last_seen: Instant::now(),
            lease_duration,
            reassembler: FragmentReassembler::new(),
        }
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    fn is_expired(&self) -> bool {
        self.last_seen.elapsed() > self.lease_duration.mul_f32(1.5)
    }

    fn arm(&mut self) {
        if self.next_flush.is_none() {
            self.next_flush = Some(Instant::now() + Duration::from_millis(HEARTBEAT_RESPONSE_DELAY_MS));
        }
    }

    fn on_heartbeat(&mut self, hb: &HeartbeatSubmessage) {
        self.touch();
        match self.writer.on_heartbeat(hb.first_sn, hb.last_sn, hb.count) {
            AcknackDecision::Ignore | AcknackDecision::RateLimited => {}
            AcknackDecision::Synchronized { bitmap_base } => {
                if !hb.is_final {
                    self.pending = Some(SequenceNumberSet::new(bitmap_base));
                    self.arm();
                }
            }
            AcknackDecision::NeedData { missing } => {
                self.pending = Some(missing);
                self.arm();
            }
        }
    }

    fn on_data(&mut self, seq: SequenceNumber) -> Vec<SequenceNumber> {
        self.touch();
        let delivered = self.writer.on_data(seq);
        if self.writer.is_synchronized() {
            self.reset_backoff();
        }
        delivered
    }

    fn on_gap(&mut self, range: SeqRange) -> Vec<SequenceNumber> {
        self.touch();
        let delivered = self.writer.on_gap(range);
        if self.writer.is_synchronized() {
            self.reset_backoff();
        }
        delivered
    }

    fn reset_backoff(&mut self) {
        self.next_flush = None;
        self.pending = None;
        self.retry_count = 0;
        self.backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
    }

    fn poll_acknack(&mut self, reader_id: EntityId, writer_id: EntityId, now: Instant) -> Option<AcknackSubmessage> {
        let deadline = self.next_flush?;
        if now < deadline {
            return None;
        }
        let reader_sn_state = self.pending.take()?;
        self.writer.mark_acknack_sent();
        self.acknack_count += 1;
        self.retry_count += 1;
        if self.retry_count >= MAX_RETRIES {
            // Given up: stop chasing this gap until the next HEARTBEAT re-arms.
            self.next_flush = None;
            self.retry_count = 0;
            self.backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        } else {
            self.backoff *= 2;
            self.next_flush = Some(now + self.backoff);
        }
        let is_final = reader_sn_state.is_empty();
        Some(AcknackSubmessage { reader_id, writer_id, reader_sn_state, count: self.acknack_count, is_final })
    }
}

/// Decompose a GAP submessage into the contiguous ranges it covers: the
/// irreducible span before the bitmap base, plus each scattered bitmap
/// member as its own singleton range.
fn gap_ranges(gap: &GapSubmessage) -> Vec<SeqRange> {
    let mut ranges = Vec::new();
    if gap.gap_start < gap.gap_list.base {
        ranges.push(SeqRange::new(gap.gap_start, gap.gap_list.base));
    }
    for seq in gap.gap_list.members() {
        ranges.push(SeqRange::new(seq, seq + 1));
    }
    ranges
}

pub struct ReliableReader {
    reader_id: EntityId,
    proxies: DashMap<Guid, ReliableProxy>,
}

impl ReliableReader {
    #[must_use]
    pub fn new(reader_id: EntityId) -> Self {
        Self { reader_id, proxies: DashMap::new() }
    }

    pub fn start(&self, writer: Guid) {
        self.proxies
            .entry(writer)
            .or_insert_with(|| ReliableProxy::new(writer, Duration::from_millis(PARTICIPANT_LEASE_DURATION_MS)));
    }

    /// Admit `change` and deliver the contiguous tail it unblocks. Cache
    /// capacity exhaustion surfaces as `Err(Error::WouldBlock)`; the caller
    /// decides whether to mark the reader blocked (see [`HistoryCache::inform_start`]).
    pub fn data(&self, writer: Guid, cache: &HistoryCache, change: Change) -> Result<Vec<Arc<Change>>> {
        let seq = change.seq;
        let arc = cache.add_received(change, true)?;
        if let Some(mut proxy) = self.proxies.get_mut(&writer) {
            proxy.on_data(seq);
        }
        Ok(vec![arc])
    }

    /// Admit one DATA_FRAG submessage, reassembling `frag.seq`'s payload once
    /// every fragment has arrived and delivering it exactly like [`Self::data`].
    /// Returns an empty vec while the assembly is still incomplete.
    pub fn data_frag(
        &self,
        writer: Guid,
        cache: &HistoryCache,
        frag: &DataFragSubmessage,
        kind: ChangeKind,
        instance: InstanceHandle,
    ) -> Result<Vec<Arc<Change>>> {
        let assembled =
            self.proxies.get_mut(&writer).and_then(|mut proxy| proxy.reassembler.accept(frag));
        let Some(payload) = assembled else {
            return Ok(Vec::new());
        };
        let change = Change::new(kind, writer, frag.seq, instance, SystemTime::now(), Arc::from(payload));
        self.data(writer, cache, change)
    }

    /// Build a NACK_FRAG for `seq`'s still-missing fragments, or `None` if
    /// nothing is in flight (already complete, or never started).
    pub fn nack_frag_for(&self, writer: Guid, seq: SequenceNumber) -> Option<NackFragSubmessage> {
        let mut proxy = self.proxies.get_mut(&writer)?;
        let missing = proxy.reassembler.missing_fragments(seq);
        if missing.is_empty() {
            return None;
        }
        proxy.nack_frag_count += 1;
        Some(NackFragSubmessage {
            reader_id: self.reader_id,
            writer_id: proxy.writer.guid.entity_id,
            writer_sn: seq,
            fragment_number_state: missing,
            count: proxy.nack_frag_count,
        })
    }

    /// Process a GAP, clearing the covered ranges from the proxy's missing
    /// set without delivering anything for them.
    pub fn gap(&self, writer: Guid, gap: &GapSubmessage) {
        if let Some(mut proxy) = self.proxies.get_mut(&writer) {
            for range in gap_ranges(gap) {
                proxy.on_gap(range);
            }
        }
    }

    pub fn heartbeat(&self, writer: Guid, hb: &HeartbeatSubmessage) {
        if let Some(mut proxy) = self.proxies.get_mut(&writer) {
            proxy.on_heartbeat(hb);
        }
    }

    /// Build an ACKNACK for every proxy whose coalescing/backoff window has
    /// expired and still has something pending.
    pub fn acknack_timer(&self, now: Instant) -> Vec<AcknackSubmessage> {
        self.proxies
            .iter_mut()
            .filter_map(|mut p| {
                let writer_id = p.writer.guid.entity_id;
                p.poll_acknack(self.reader_id, writer_id, now)
            })
            .collect()
    }

    /// Matched writers whose lease has expired without activity.
    pub fn alive_timer(&self) -> Vec<Guid> {
        let expired: Vec<Guid> = self.proxies.iter().filter(|p| p.is_expired()).map(|p| *p.key()).collect();
        for guid in &expired {
            self.proxies.remove(guid);
        }
        expired
    }

    pub fn finish(&self, writer: Guid) {
        self.proxies.remove(&writer);
    }

    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.proxies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ChangeKind;
    use crate::qos::{History, ResourceLimits};
    use std::time::SystemTime;

    fn change(seq: u64) -> Change {
        Change::new(ChangeKind::Alive, Guid::unknown(), seq, [0u8; 16], SystemTime::now(), Arc::from(&b"x"[..]))
    }

    #[test]
    fn heartbeat_with_missing_data_arms_acknack() {
        let r = ReliableReader::new(EntityId::UNKNOWN);
        r.start(Guid::unknown());
        let hb = HeartbeatSubmessage {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            first_sn: 1,
            last_sn: 3,
            count: 1,
            is_final: false,
            liveliness: false,
        };
        r.heartbeat(Guid::unknown(), &hb);
        let due = Instant::now() + Duration::from_millis(HEARTBEAT_RESPONSE_DELAY_MS + 1);
        let acknacks = r.acknack_timer(due);
        assert_eq!(acknacks.len(), 1);
        assert!(!acknacks[0].reader_sn_state.is_empty());
    }

    #[test]
    fn no_acknack_before_window_expires() {
        let r = ReliableReader::new(EntityId::UNKNOWN);
        r.start(Guid::unknown());
        let hb = HeartbeatSubmessage {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            first_sn: 1,
            last_sn: 3,
            count: 1,
            is_final: false,
            liveliness: false,
        };
        r.heartbeat(Guid::unknown(), &hb);
        assert!(r.acknack_timer(Instant::now()).is_empty());
    }

    #[test]
    fn data_delivers_and_clears_pending_acknack() {
        let r = ReliableReader::new(EntityId::UNKNOWN);
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        r.start(Guid::unknown());
        let hb = HeartbeatSubmessage {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            first_sn: 1,
            last_sn: 1,
            count: 1,
            is_final: false,
            liveliness: false,
        };
        r.heartbeat(Guid::unknown(), &hb);
        let delivered = r.data(Guid::unknown(), &cache, change(1)).unwrap();
        assert_eq!(delivered.len(), 1);
        let due = Instant::now() + Duration::from_millis(HEARTBEAT_RESPONSE_DELAY_MS + 1);
        assert!(r.acknack_timer(due).is_empty(), "synchronized proxy has nothing pending");
    }

    #[test]
    fn gap_fills_hole_without_acknack() {
        let r = ReliableReader::new(EntityId::UNKNOWN);
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        r.start(Guid::unknown());
        r.data(Guid::unknown(), &cache, change(1)).unwrap();
        r.data(Guid::unknown(), &cache, change(3)).unwrap();
        let gap = GapSubmessage::for_range(EntityId::UNKNOWN, EntityId::UNKNOWN, SeqRange::new(2, 3));
        r.gap(Guid::unknown(), &gap);
        assert!(r.proxies.get(&Guid::unknown()).unwrap().writer.is_synchronized());
    }

    fn data_frag(seq: u64, starting_num: u32, data_size: u32, fragment_size: u16, payload: &[u8]) -> DataFragSubmessage {
        DataFragSubmessage {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            seq,
            fragment_starting_num: starting_num,
            fragments_in_submessage: 1,
            fragment_size,
            data_size,
            fragment: payload.to_vec(),
        }
    }

    #[test]
    fn data_frag_delivers_once_complete() {
        let r = ReliableReader::new(EntityId::UNKNOWN);
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        r.start(Guid::unknown());

        let first = r
            .data_frag(Guid::unknown(), &cache, &data_frag(1, 1, 4, 2, b"ab"), ChangeKind::Alive, [0u8; 16])
            .unwrap();
        assert!(first.is_empty(), "incomplete assembly delivers nothing yet");

        let delivered = r
            .data_frag(Guid::unknown(), &cache, &data_frag(1, 2, 4, 2, b"cd"), ChangeKind::Alive, [0u8; 16])
            .unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(&*delivered[0].data, b"abcd");
    }

    #[test]
    fn nack_frag_for_reports_missing_fragments_until_complete() {
        let r = ReliableReader::new(EntityId::UNKNOWN);
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        r.start(Guid::unknown());

        r.data_frag(Guid::unknown(), &cache, &data_frag(1, 1, 6, 2, b"ab"), ChangeKind::Alive, [0u8; 16]).unwrap();
        let nack = r.nack_frag_for(Guid::unknown(), 1).expect("fragments 2 and 3 still missing");
        assert_eq!(nack.fragment_number_state, vec![2, 3]);

        r.data_frag(Guid::unknown(), &cache, &data_frag(1, 2, 6, 2, b"cd"), ChangeKind::Alive, [0u8; 16]).unwrap();
        r.data_frag(Guid::unknown(), &cache, &data_frag(1, 3, 6, 2, b"ef"), ChangeKind::Alive, [0u8; 16]).unwrap();
        assert!(r.nack_frag_for(Guid::unknown(), 1).is_none(), "assembly completed, nothing left to request");
    }

    #[test]
    fn finish_removes_proxy() {
        let r = ReliableReader::new(EntityId::UNKNOWN);
        r.start(Guid::unknown());
        assert_eq!(r.matched_count(), 1);
        r.finish(Guid::unknown());
        assert_eq!(r.matched_count(), 0);
    }
}
