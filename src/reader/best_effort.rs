// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Best-effort reader: no repair. A gap is simply skipped over rather than
//! requested back from the writer.

use crate::cache::{Change, ChangeKind, HistoryCache};
use crate::error::Result;
use crate::message::DataFragSubmessage;
use crate::reader::fragment::FragmentReassembler;
use crate::types::{Guid, InstanceHandle, SeqRange, SequenceNumber};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::SystemTime;

struct BestEffortProxy {
    /// Next sequence number this proxy expects. DATA below this is a stale
    /// duplicate; DATA at or above it is delivered and jumps `expected`
    /// forward, abandoning anything in between.
    expected: SequenceNumber,
    reassembler: FragmentReassembler,
}

impl BestEffortProxy {
    fn new() -> Self {
        Self { expected: 1, reassembler: FragmentReassembler::new() }
    }
}

#[derive(Default)]
pub struct BestEffortReader {
    proxies: DashMap<Guid, BestEffortProxy>,
}

impl BestEffortReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, writer: Guid) {
        self.proxies.entry(writer).or_insert_with(BestEffortProxy::new);
    }

    /// Admit `change` into `cache` if it is not a stale duplicate. Content
    /// and time-based filtering happen inside [`HistoryCache::add_received`].
    pub fn data(&self, writer: Guid, cache: &HistoryCache, change: Change) -> Result<Option<Arc<Change>>> {
        let mut proxy = self.proxies.entry(writer).or_insert_with(BestEffortProxy::new);
        if change.seq < proxy.expected {
            return Ok(None);
        }
        proxy.expected = change.seq + 1;
        drop(proxy);
        cache.add_received(change, false).map(Some)
    }

    /// Admit one DATA_FRAG submessage, reassembling and delivering it once
    /// complete. Never triggers NACK_FRAG — best-effort readers drop a
    /// never-completed assembly instead of requesting the missing fragments.
    pub fn data_frag(
        &self,
        writer: Guid,
        cache: &HistoryCache,
        frag: &DataFragSubmessage,
        kind: ChangeKind,
        instance: InstanceHandle,
    ) -> Result<Option<Arc<Change>>> {
        let mut proxy = self.proxies.entry(writer).or_insert_with(BestEffortProxy::new);
        if frag.seq < proxy.expected {
            return Ok(None);
        }
        let Some(payload) = proxy.reassembler.accept(frag) else {
            return Ok(None);
        };
        drop(proxy);
        let change = Change::new(kind, writer, frag.seq, instance, SystemTime::now(), Arc::from(payload));
        self.data(writer, cache, change)
    }

    /// A GAP just moves `expected` past whatever the writer says it will
    /// never send; best-effort readers never ask for a retransmit anyway.
    pub fn gap(&self, writer: Guid, range: SeqRange) {
        if let Some(mut proxy) = self.proxies.get_mut(&writer) {
            proxy.expected = proxy.expected.max(range.end);
        }
    }

    /// HEARTBEATs are informational only — best-effort readers never ACK.
    pub fn heartbeat(&self, _writer: Guid, _first_sn: SequenceNumber, _last_sn: SequenceNumber, _count: u32) {}

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
    fn in_order_data_is_delivered_and_advances_expected() {
        let r = BestEffortReader::new();
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        r.start(Guid::unknown());
        assert!(r.data(Guid::unknown(), &cache, change(1)).unwrap().is_some());
        assert!(r.data(Guid::unknown(), &cache, change(2)).unwrap().is_some());
    }

    #[test]
    fn gap_jumps_forward_with_no_repair() {
        let r = BestEffortReader::new();
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        r.start(Guid::unknown());
        // Seq 5 arrives first; seqs 1..5 are simply never requested back.
        assert!(r.data(Guid::unknown(), &cache, change(5)).unwrap().is_some());
        // A stale seq 2 now arrives — dropped as a duplicate, not delivered.
        assert!(r.data(Guid::unknown(), &cache, change(2)).unwrap().is_none());
    }

    #[test]
    fn gap_submessage_advances_expected_without_requiring_data() {
        let r = BestEffortReader::new();
        r.start(Guid::unknown());
        r.gap(Guid::unknown(), SeqRange::new(1, 10));
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        assert!(r.data(Guid::unknown(), &cache, change(3)).unwrap().is_none(), "seq 3 already gapped over");
        assert!(r.data(Guid::unknown(), &cache, change(10)).unwrap().is_some());
    }

    fn data_frag(seq: u64, starting_num: u32, data_size: u32, fragment_size: u16, payload: &[u8]) -> DataFragSubmessage {
        DataFragSubmessage {
            reader_id: crate::types::EntityId::UNKNOWN,
            writer_id: crate::types::EntityId::UNKNOWN,
            seq,
            fragment_starting_num: starting_num,
            fragments_in_submessage: 1,
            fragment_size,
            data_size,
            fragment: payload.to_vec(),
        }
    }

    #[test]
    fn data_frag_delivers_once_every_fragment_arrives() {
        let r = BestEffortReader::new();
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        r.start(Guid::unknown());

        assert!(r
            .data_frag(Guid::unknown(), &cache, &data_frag(1, 1, 4, 2, b"ab"), ChangeKind::Alive, [0u8; 16])
            .unwrap()
            .is_none());
        let delivered = r
            .data_frag(Guid::unknown(), &cache, &data_frag(1, 2, 4, 2, b"cd"), ChangeKind::Alive, [0u8; 16])
            .unwrap()
            .expect("both fragments arrived");
        assert_eq!(&*delivered.data, b"abcd");
    }

    #[test]
    fn stale_data_frag_is_dropped_without_reassembly() {
        let r = BestEffortReader::new();
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        r.start(Guid::unknown());
        assert!(r.data(Guid::unknown(), &cache, change(5)).unwrap().is_some());
        assert!(r
            .data_frag(Guid::unknown(), &cache, &data_frag(2, 1, 4, 2, b"ab"), ChangeKind::Alive, [0u8; 16])
            .unwrap()
            .is_none());
    }

    #[test]
    fn finish_removes_proxy() {
        let r = BestEffortReader::new();
        r.start(Guid::unknown());
        assert_eq!(r.matched_count(), 1);
        r.finish(Guid::unknown());
        assert_eq!(r.matched_count(), 0);
    }
}
