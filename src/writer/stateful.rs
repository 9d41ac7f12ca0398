// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stateful writer variants: one [`RemoteReaderProxy`] per matched reader,
//! discovered via SEDP. Both variants share the same `DashMap`-backed proxy
//! registry (grounded on the teacher's `MatchedReadersRegistry`, generalized
//! from a single acked-sequence counter to the full unsent/unacked/requested
//! tracking [`RemoteReaderProxy`] already provides).

use super::transmit::{GapTx, HeartbeatTx, RetransmitPlan, WriterRetransmitHandler};
use crate::cache::{Change, HistoryCache};
use crate::message::{GapSubmessage, HeartbeatSubmessage};
use crate::proxy::RemoteReaderProxy;
use crate::types::{EntityId, Guid, SequenceNumber, SequenceNumberSet};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// `StatefulBestEffortWriter`: per-proxy sequence tracking, but no
/// acknowledgement handling — a change is considered delivered the moment
/// it's handed to the transport, so `send_now` immediately forgets it.
#[derive(Default)]
pub struct StatefulBestEffortWriter {
    proxies: DashMap<Guid, RemoteReaderProxy>,
}

impl StatefulBestEffortWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, reader: Guid, lease_duration: Duration) {
        self.proxies.entry(reader).or_insert_with(|| RemoteReaderProxy::new(reader, lease_duration));
    }

    pub fn new_change(&self, reader: Guid, seq: SequenceNumber) {
        if let Some(mut proxy) = self.proxies.get_mut(&reader) {
            proxy.queue_change(seq);
        }
    }

    /// Drain unsent sequences for `reader` and immediately forget them —
    /// best-effort writers never retain acknowledgement state.
    pub fn send_now(&self, reader: Guid) -> Vec<SequenceNumber> {
        let Some(mut proxy) = self.proxies.get_mut(&reader) else { return Vec::new() };
        let seqs = proxy.take_unsent();
        for seq in &seqs {
            proxy.forget(*seq);
        }
        seqs
    }

    pub fn rem_change(&self, reader: Guid, seq: SequenceNumber) {
        if let Some(mut proxy) = self.proxies.get_mut(&reader) {
            proxy.forget(seq);
        }
    }

    pub fn finish(&self, reader: Guid) {
        self.proxies.remove(&reader);
    }

    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.proxies.len()
    }
}

/// `StatefulReliableWriter`: the hardest of the four. Each proxy carries its
/// own unsent/unacked/requested sets via [`RemoteReaderProxy`]; HEARTBEAT
/// count and GAP accounting are shared across proxies since they belong to
/// this writer, not to any one reader association.
pub struct StatefulReliableWriter {
    writer_id: EntityId,
    proxies: DashMap<Guid, RemoteReaderProxy>,
    heartbeat: Mutex<HeartbeatTx>,
    gap: Mutex<GapTx>,
}

impl StatefulReliableWriter {
    #[must_use]
    pub fn new(writer_id: EntityId, heartbeat_period: Duration) -> Self {
        Self {
            writer_id,
            proxies: DashMap::new(),
            heartbeat: Mutex::new(HeartbeatTx::with_period_ms(
                heartbeat_period.as_millis() as u64,
                super::transmit::DEFAULT_JITTER_PCT,
            )),
            gap: Mutex::new(GapTx::new()),
        }
    }

    pub fn start(&self, reader: Guid, lease_duration: Duration) {
        self.proxies.entry(reader).or_insert_with(|| RemoteReaderProxy::new(reader, lease_duration));
    }

    pub fn new_change(&self, reader: Guid, seq: SequenceNumber) {
        if let Some(mut proxy) = self.proxies.get_mut(&reader) {
            proxy.queue_change(seq);
        }
    }

    /// Drain unsent sequences for `reader`, plus a HEARTBEAT if one is due
    /// or `urgent` demands an immediate announcement after a write.
    pub fn send_now(
        &self,
        reader: Guid,
        urgent: bool,
    ) -> (Vec<SequenceNumber>, Option<HeartbeatSubmessage>) {
        let Some(mut proxy) = self.proxies.get_mut(&reader) else { return (Vec::new(), None) };
        let unsent = proxy.take_unsent();
        let mut hb_tx = self.heartbeat.lock();
        let heartbeat = if urgent || hb_tx.is_due() {
            proxy.heartbeat_sent();
            proxy.unacked_range().map(|(first, last)| {
                hb_tx.build(EntityId::UNKNOWN, self.writer_id, first, last, false)
            })
        } else {
            None
        };
        (unsent, heartbeat)
    }

    /// Process an ACKNACK from `reader`; idempotent w.r.t. repeated counts
    /// per [`RemoteReaderProxy::on_acknack`]. When the reader requested
    /// retransmits, splits them into cache hits (verbatim resend) and
    /// misses (GAP) via the shared [`WriterRetransmitHandler`].
    pub fn on_acknack(
        &self,
        reader: Guid,
        cache: &HistoryCache,
        reader_sn_state: &SequenceNumberSet,
        count: u32,
    ) -> Option<RetransmitPlan> {
        let mut proxy = self.proxies.get_mut(&reader)?;
        if !proxy.on_acknack(reader_sn_state, count) {
            return None;
        }
        let requested = proxy.take_requested();
        drop(proxy);
        let mut gap_tx = self.gap.lock();
        let mut handler = WriterRetransmitHandler::new(cache, &mut gap_tx);
        Some(handler.on_requested(EntityId::UNKNOWN, self.writer_id, &requested))
    }

    /// True once no matched proxy's unacked range still spans `seq`. Bounds
    /// rather than exact membership (conservative in the safe direction:
    /// may hold the cache's `c_wack` a little longer than strictly needed,
    /// never release it early). The caller uses this to decide when to call
    /// [`HistoryCache::ack_change`] — the cache's `c_wack` tracks "at least
    /// one reliable proxy still pending" globally, not a per-proxy count.
    #[must_use]
    pub fn all_acked(&self, seq: SequenceNumber) -> bool {
        !self.proxies.iter().any(|p| p.unacked_range().is_some_and(|(first, last)| seq >= first && seq <= last))
    }

    pub fn rem_change(&self, reader: Guid, seq: SequenceNumber) {
        if let Some(mut proxy) = self.proxies.get_mut(&reader) {
            proxy.forget(seq);
        }
    }

    pub fn finish(&self, reader: Guid) {
        self.proxies.remove(&reader);
    }

    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.proxies.len()
    }

    /// Readers whose HEARTBEAT is overdue (used by the periodic driver to
    /// pick up proxies that had nothing new to send but still need a
    /// liveliness-refreshing HEARTBEAT).
    #[must_use]
    pub fn needs_heartbeat(&self, min_interval: Duration) -> Vec<Guid> {
        self.proxies
            .iter()
            .filter(|p| p.needs_heartbeat(min_interval))
            .map(|p| *p.key())
            .collect()
    }

    pub fn cleanup_expired(&self) -> usize {
        let before = self.proxies.len();
        self.proxies.retain(|_, p| !p.is_expired());
        before - self.proxies.len()
    }

    /// Build a GAP for `range` directed at `reader`, e.g. when the history
    /// cache evicted changes the reader never received.
    pub fn gap_for(&self, reader_id: EntityId, range: crate::types::SeqRange) -> Vec<GapSubmessage> {
        self.gap.lock().build_for_range(reader_id, self.writer_id, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::{History, ResourceLimits};

    fn guid(id: u8) -> Guid {
        let mut g = Guid::unknown();
        g.prefix[0] = id;
        g
    }

    #[test]
    fn best_effort_forgets_immediately_after_send() {
        let w = StatefulBestEffortWriter::new();
        w.start(guid(1), Duration::from_secs(10));
        w.new_change(guid(1), 1);
        w.new_change(guid(1), 2);
        assert_eq!(w.send_now(guid(1)), vec![1, 2]);
        assert!(w.send_now(guid(1)).is_empty());
    }

    #[test]
    fn reliable_heartbeat_fires_when_urgent() {
        let w = StatefulReliableWriter::new(EntityId::UNKNOWN, Duration::from_secs(10));
        w.start(guid(1), Duration::from_secs(10));
        w.new_change(guid(1), 1);
        let (unsent, hb) = w.send_now(guid(1), true);
        assert_eq!(unsent, vec![1]);
        let hb = hb.expect("urgent send_now must carry a heartbeat");
        assert_eq!(hb.first_sn, 1);
        assert_eq!(hb.last_sn, 1);
    }

    #[test]
    fn reliable_no_heartbeat_when_not_due_and_not_urgent() {
        let w = StatefulReliableWriter::new(EntityId::UNKNOWN, Duration::from_secs(10));
        w.start(guid(1), Duration::from_secs(10));
        w.new_change(guid(1), 1);
        let (_, hb) = w.send_now(guid(1), false);
        assert!(hb.is_none());
    }

    #[test]
    fn acknack_splits_retransmits_and_gaps() {
        let w = StatefulReliableWriter::new(EntityId::UNKNOWN, Duration::from_secs(10));
        w.start(guid(1), Duration::from_secs(10));
        w.new_change(guid(1), 1);
        w.new_change(guid(1), 2);
        w.send_now(guid(1), false);

        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        let change = Change::new(
            crate::cache::ChangeKind::Alive,
            Guid::unknown(),
            1,
            [0u8; 16],
            std::time::SystemTime::now(),
            Arc::from(&b"x"[..]),
        );
        cache.add_inst(change, true).unwrap();
        // seq 2 deliberately never added: simulates eviction/never-existed.

        let mut set = SequenceNumberSet::new(1);
        set.add(1);
        set.add(2);
        let plan = w.on_acknack(guid(1), &cache, &set, 1).expect("requested retransmit");
        assert_eq!(plan.retransmits.len(), 1);
        assert_eq!(plan.retransmits[0].seq, 1);
        assert_eq!(plan.gaps.len(), 1);
        assert_eq!(plan.gaps[0].gap_start, 2);
    }

    #[test]
    fn duplicate_acknack_count_yields_no_plan() {
        let w = StatefulReliableWriter::new(EntityId::UNKNOWN, Duration::from_secs(10));
        w.start(guid(1), Duration::from_secs(10));
        w.new_change(guid(1), 1);
        w.send_now(guid(1), false);

        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        let set = SequenceNumberSet::new(2);
        assert!(w.on_acknack(guid(1), &cache, &set, 1).is_none());
        assert!(w.on_acknack(guid(1), &cache, &set, 1).is_none(), "repeated count must be idempotent");
    }

    #[test]
    fn finish_removes_proxy() {
        let w = StatefulBestEffortWriter::new();
        w.start(guid(1), Duration::from_secs(10));
        assert_eq!(w.matched_count(), 1);
        w.finish(guid(1));
        assert_eq!(w.matched_count(), 0);
    }
}
