// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-writer DATA_FRAG reassembly (RTPS Sec.8.3.7.3.1), paired with the
//! missing-fragment query a reliable reader uses to build NACK_FRAG.

use crate::message::DataFragSubmessage;
use crate::types::SequenceNumber;
use std::collections::{BTreeMap, HashMap};

struct Assembly {
    data_size: u32,
    total_fragments: u32,
    fragments: BTreeMap<u32, Vec<u8>>,
}

impl Assembly {
    fn new(frag: &DataFragSubmessage) -> Self {
        let fragment_size = u32::from(frag.fragment_size).max(1);
        let total_fragments = frag.data_size.div_ceil(fragment_size).max(1);
        Self { data_size: frag.data_size, total_fragments, fragments: BTreeMap::new() }
    }

    fn accept(&mut self, frag: &DataFragSubmessage) {
        self.fragments.entry(frag.fragment_starting_num).or_insert_with(|| frag.fragment.clone());
    }

    fn is_complete(&self) -> bool {
        self.fragments.len() as u32 >= self.total_fragments
    }

    fn missing(&self) -> Vec<u32> {
        (1..=self.total_fragments).filter(|n| !self.fragments.contains_key(n)).collect()
    }

    fn assemble(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data_size as usize);
        for n in 1..=self.total_fragments {
            if let Some(chunk) = self.fragments.get(&n) {
                out.extend_from_slice(chunk);
            }
        }
        out.truncate(self.data_size as usize);
        out
    }
}

/// Reassembles DATA_FRAG submessages into whole payloads, one in-flight
/// [`Assembly`] per sequence number currently being fragmented.
#[derive(Default)]
pub struct FragmentReassembler {
    pending: HashMap<SequenceNumber, Assembly>,
}

impl FragmentReassembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment; returns the assembled payload once every fragment
    /// for `frag.seq` has arrived, consuming the in-flight state.
    pub fn accept(&mut self, frag: &DataFragSubmessage) -> Option<Vec<u8>> {
        let assembly = self.pending.entry(frag.seq).or_insert_with(|| Assembly::new(frag));
        assembly.accept(frag);
        if assembly.is_complete() {
            let data = assembly.assemble();
            self.pending.remove(&frag.seq);
            Some(data)
        } else {
            None
        }
    }

    /// Fragment numbers still missing for `seq`, driving NACK_FRAG; empty
    /// when `seq` has no in-flight assembly (nothing to request).
    #[must_use]
    pub fn missing_fragments(&self, seq: SequenceNumber) -> Vec<u32> {
        self.pending.get(&seq).map(Assembly::missing).unwrap_or_default()
    }

    /// Drop in-flight reassembly state for `seq`, e.g. once a GAP supersedes it.
    pub fn forget(&mut self, seq: SequenceNumber) {
        self.pending.remove(&seq);
    }
}
