// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Best-effort delivery: gaps are tolerated, duplicates never are, and
//! whatever arrives is accepted in non-decreasing sequence-number order.

use rtps_engine::cache::{Change, ChangeKind, HistoryCache};
use rtps_engine::qos::{History, ResourceLimits};
use rtps_engine::reader::best_effort::BestEffortReader;
use rtps_engine::types::Guid;
use std::sync::Arc;
use std::time::SystemTime;

fn change(writer: Guid, seq: u64) -> Change {
    Change::new(ChangeKind::Alive, writer, seq, [0; 16], SystemTime::now(), Arc::from(&b"x"[..]))
}

#[test]
fn gaps_are_skipped_and_late_duplicates_are_rejected() {
    let reader = BestEffortReader::new();
    let cache = HistoryCache::new(ResourceLimits::default(), History::KeepAll);
    let writer = Guid::unknown();
    reader.start(writer);

    // Only odd sequence numbers arrive out of a run of 20; this models a
    // transport that silently drops the even ones.
    let mut delivered = Vec::new();
    for seq in 1..=20u64 {
        if seq % 2 == 1 {
            if let Some(c) = reader.data(writer, &cache, change(writer, seq)).unwrap() {
                delivered.push(c.seq);
            }
        }
    }
    assert_eq!(delivered, (1..=20).step_by(2).collect::<Vec<_>>());

    // A stale duplicate (anything already skipped past) must be rejected.
    assert!(reader.data(writer, &cache, change(writer, 5)).unwrap().is_none());
    // Out-of-order but still ahead of `expected` is accepted.
    assert!(reader.data(writer, &cache, change(writer, 25)).unwrap().is_some());

    let cached = cache.read(rtps_engine::cache::StateMask::any());
    let mut seqs: Vec<_> = cached.iter().map(|c| c.seq).collect();
    seqs.sort_unstable();
    assert_eq!(seqs.windows(2).all(|w| w[0] < w[1]), true, "no duplicate sequence numbers reach the cache");
}
