// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer-side submessage builders shared by the stateless-reliable and
//! stateful-reliable [`super::WriterKind`] arms: periodic HEARTBEAT with
//! jitter, GAP batching, the NACK-to-retransmit/GAP split, and DATA_FRAG
//! splitting for changes too large to send whole.

use crate::cache::{Change, HistoryCache};
use crate::message::{DataFragSubmessage, GapSubmessage, HeartbeatSubmessage};
use crate::types::{EntityId, SeqRange, SequenceNumber, SequenceNumberSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default HEARTBEAT period before jitter is applied.
pub const DEFAULT_PERIOD_MS: u64 = 100;
/// Default jitter, as a percentage of the period.
pub const DEFAULT_JITTER_PCT: u8 = 10;

/// Periodic HEARTBEAT builder. One instance per reliable writer (shared
/// across all its matched proxies, since the count is part of the writer's
/// own monotonic sequence, not per-proxy).
#[derive(Debug)]
pub struct HeartbeatTx {
    next_deadline: Instant,
    period: Duration,
    jitter_pct: u8,
    count: u32,
}

impl HeartbeatTx {
    #[must_use]
    pub fn new() -> Self {
        Self::with_period_ms(DEFAULT_PERIOD_MS, DEFAULT_JITTER_PCT)
    }

    #[must_use]
    pub fn with_period_ms(period_ms: u64, jitter_pct: u8) -> Self {
        let period = Duration::from_millis(period_ms);
        Self { next_deadline: Instant::now() + Self::jittered(period, jitter_pct), period, jitter_pct, count: 0 }
    }

    #[must_use]
    pub fn is_due(&self) -> bool {
        Instant::now() >= self.next_deadline
    }

    /// Build a HEARTBEAT for `[first_sn, last_sn]` and arm the next deadline.
    pub fn build(
        &mut self,
        reader_id: EntityId,
        writer_id: EntityId,
        first_sn: SequenceNumber,
        last_sn: SequenceNumber,
        is_final: bool,
    ) -> HeartbeatSubmessage {
        let count = self.count;
        self.count = self.count.wrapping_add(1);
        self.next_deadline = Instant::now() + Self::jittered(self.period, self.jitter_pct);
        HeartbeatSubmessage { reader_id, writer_id, first_sn, last_sn, count, is_final, liveliness: false }
    }

    /// +/- `jitter_pct`% of `period`, seeded off the low bits of the clock
    /// rather than a PRNG so HEARTBEATs from many proxies don't phase-lock.
    fn jittered(period: Duration, jitter_pct: u8) -> Duration {
        if jitter_pct == 0 {
            return period;
        }
        let seed = (Instant::now().elapsed().as_nanos() % 200) as i64;
        let factor = seed - 100; // -100..=100
        let base_ms = period.as_millis() as i128;
        let jitter_ms = base_ms
            .saturating_mul(i128::from(jitter_pct))
            .saturating_mul(i128::from(factor))
            / 10_000;
        let adjusted = base_ms.saturating_add(jitter_ms).max(1) as u128;
        Duration::from_millis(adjusted.min(u128::from(u64::MAX)) as u64)
    }
}

impl Default for HeartbeatTx {
    fn default() -> Self {
        Self::new()
    }
}

/// GAP batching for sequences the writer can no longer retransmit, either
/// because they fell outside the history cache's depth or never existed.
#[derive(Debug, Default)]
pub struct GapTx {
    gap_count: u64,
    total_lost: u64,
}

impl GapTx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch `range` into GAP messages, chunked at the bitmap's maximum
    /// width so a single GAP never needs more than [`crate::types::MAX_BITMAP_BITS`] bits.
    pub fn build_for_range(
        &mut self,
        reader_id: EntityId,
        writer_id: EntityId,
        range: SeqRange,
    ) -> Vec<GapSubmessage> {
        if range.is_empty() {
            return Vec::new();
        }
        let chunk = u64::from(crate::types::MAX_BITMAP_BITS);
        let mut out = Vec::new();
        let mut cursor = range.start;
        while cursor < range.end {
            let chunk_end = (cursor + chunk).min(range.end);
            self.gap_count += 1;
            self.total_lost += chunk_end - cursor;
            out.push(GapSubmessage::for_range(reader_id, writer_id, SeqRange::new(cursor, chunk_end)));
            cursor = chunk_end;
        }
        out
    }

    /// Batch an explicit, ascending list of missing sequences. Each GAP
    /// covers one missing sequence plus any others within the bitmap's
    /// window of the first one in the chunk.
    pub fn build_for_sequences(
        &mut self,
        reader_id: EntityId,
        writer_id: EntityId,
        sequences: &[SequenceNumber],
    ) -> Vec<GapSubmessage> {
        if sequences.is_empty() {
            return Vec::new();
        }
        let window = u64::from(crate::types::MAX_BITMAP_BITS);
        let mut out = Vec::new();
        let mut idx = 0;
        while idx < sequences.len() {
            let gap_start = sequences[idx];
            let mut set = SequenceNumberSet::new(gap_start + 1);
            let max_seq = gap_start + window;
            let mut j = idx + 1;
            while j < sequences.len() && sequences[j] <= max_seq {
                set.add(sequences[j]);
                j += 1;
            }
            self.gap_count += 1;
            self.total_lost += 1 + (j - idx - 1) as u64;
            out.push(GapSubmessage { reader_id, writer_id, gap_start, gap_list: set });
            idx = j;
        }
        out
    }

    #[must_use]
    pub fn gap_count(&self) -> u64 {
        self.gap_count
    }

    #[must_use]
    pub fn total_lost(&self) -> u64 {
        self.total_lost
    }
}

/// Thin counter wrapping INFO_TS construction; the writer only needs the
/// submessage itself (built by the caller from a `SystemTime`), but keeping
/// a counter here mirrors the reader-visible behaviour of the writer's other
/// transmit helpers.
#[derive(Debug, Default)]
pub struct InfoTsTx {
    count: u64,
}

impl InfoTsTx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_sent(&mut self) -> u64 {
        self.count += 1;
        self.count
    }
}

/// Thin counter wrapping INFO_DST construction, tracking the last prefix a
/// directed retransmit targeted.
#[derive(Debug, Default)]
pub struct InfoDstTx {
    count: u64,
    last_prefix: Option<crate::types::GuidPrefix>,
}

impl InfoDstTx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_sent(&mut self, prefix: crate::types::GuidPrefix) -> u64 {
        self.count += 1;
        self.last_prefix = Some(prefix);
        self.count
    }

    #[must_use]
    pub fn last_prefix(&self) -> Option<crate::types::GuidPrefix> {
        self.last_prefix
    }
}

/// Split `change`'s payload into DATA_FRAG submessages of at most
/// `fragment_size` bytes each (RTPS Sec.8.3.7.3.1). Callers only need this
/// when [`needs_fragmenting`] says the whole payload is too large for one
/// DATA submessage; fragment numbering always starts at 1.
#[must_use]
pub fn fragments_for(
    reader_id: EntityId,
    writer_id: EntityId,
    change: &Change,
    fragment_size: u16,
) -> Vec<DataFragSubmessage> {
    let data_size = change.data.len() as u32;
    let chunk = usize::from(fragment_size).max(1);
    change
        .data
        .chunks(chunk)
        .enumerate()
        .map(|(i, bytes)| DataFragSubmessage {
            reader_id,
            writer_id,
            seq: change.seq,
            fragment_starting_num: i as u32 + 1,
            fragments_in_submessage: 1,
            fragment_size,
            data_size,
            fragment: bytes.to_vec(),
        })
        .collect()
}

/// True once `change`'s payload no longer fits in a single DATA submessage
/// bounded by `max_msg_size` (`config::MAX_MSG_SIZE_BYTES`).
#[must_use]
pub fn needs_fragmenting(change: &Change, max_msg_size: usize) -> bool {
    change.data.len() > max_msg_size
}

/// What to actually put on the wire for one change: sent whole, or split
/// into DATA_FRAG submessages because it exceeds `config::MAX_MSG_SIZE_BYTES`.
pub enum OutgoingData {
    Whole(Arc<Change>),
    Fragmented(Vec<DataFragSubmessage>),
}

/// Decide how `change` should go out, fragmenting at `config::FRAG_SIZE_BYTES`
/// when it's too large to send as one DATA.
#[must_use]
pub fn outgoing_for(reader_id: EntityId, writer_id: EntityId, change: &Arc<Change>) -> OutgoingData {
    if needs_fragmenting(change, crate::config::MAX_MSG_SIZE_BYTES) {
        OutgoingData::Fragmented(fragments_for(reader_id, writer_id, change, crate::config::FRAG_SIZE_BYTES))
    } else {
        OutgoingData::Whole(change.clone())
    }
}

/// Result of processing one NACK: changes to retransmit verbatim, fragmented
/// changes that no longer fit in a single DATA, and GAPs for sequences no
/// longer in the cache.
pub struct RetransmitPlan {
    pub retransmits: Vec<Arc<Change>>,
    pub fragmented: Vec<Vec<DataFragSubmessage>>,
    pub gaps: Vec<GapSubmessage>,
}

/// Splits a reader's requested sequence set into cache hits (retransmit
/// as-is) and cache misses (GAP), since a single ACKNACK/NACK_FRAG can span
/// both — some requested samples may have already aged out of the history
/// cache's depth while others are still retained.
pub struct WriterRetransmitHandler<'a> {
    cache: &'a HistoryCache,
    gap_tx: &'a mut GapTx,
}

impl<'a> WriterRetransmitHandler<'a> {
    pub fn new(cache: &'a HistoryCache, gap_tx: &'a mut GapTx) -> Self {
        Self { cache, gap_tx }
    }

    pub fn on_requested(
        &mut self,
        reader_id: EntityId,
        writer_id: EntityId,
        requested: &[SequenceNumber],
    ) -> RetransmitPlan {
        let mut retransmits = Vec::new();
        let mut fragmented = Vec::new();
        let mut missing = Vec::new();
        for &seq in requested {
            match self.cache.find_by_seq(seq) {
                Some(change) if needs_fragmenting(&change, crate::config::MAX_MSG_SIZE_BYTES) => {
                    fragmented.push(fragments_for(reader_id, writer_id, &change, crate::config::FRAG_SIZE_BYTES));
                }
                Some(change) => retransmits.push(change),
                None => missing.push(seq),
            }
        }
        let gaps = self.gap_tx.build_for_sequences(reader_id, writer_id, &missing);
        RetransmitPlan { retransmits, fragmented, gaps }
    }

    /// Build the DATA_FRAG submessages covering the fragment numbers a
    /// reader's NACK_FRAG reports missing for `seq`.
    #[must_use]
    pub fn on_requested_frag(
        &self,
        reader_id: EntityId,
        writer_id: EntityId,
        seq: SequenceNumber,
        missing_fragments: &[u32],
    ) -> Vec<DataFragSubmessage> {
        let Some(change) = self.cache.find_by_seq(seq) else { return Vec::new() };
        let all = fragments_for(reader_id, writer_id, &change, crate::config::FRAG_SIZE_BYTES);
        all.into_iter().filter(|f| missing_fragments.contains(&f.fragment_starting_num)).collect()
    }
}
