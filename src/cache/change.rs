// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! A single cached sample (writer- or reader-side) and its bookkeeping state.

use crate::types::{Guid, InstanceHandle, SequenceNumber};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Disposition of a change, per RTPS Sec.8.3.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Alive,
    Disposed,
    Unregistered,
}

/// DDS `SampleStateKind`: has the application already read this sample?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleState {
    Read,
    NotRead,
}

/// DDS `ViewStateKind`: is this the first sample the reader has seen for the
/// instance since the instance last transitioned to alive?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    New,
    NotNew,
}

/// DDS `InstanceStateKind`: lifecycle of the keyed instance this change
/// belongs to, tracked per-instance rather than per-change (see
/// [`crate::cache::InstanceRecord`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Alive,
    NotAliveDisposed,
    NotAliveNoWriters,
}

/// A filter over the three DDS read/take state dimensions. `None` in any
/// field means "don't filter on this dimension".
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMask {
    pub sample: Option<SampleState>,
    pub view: Option<ViewState>,
    pub instance: Option<InstanceState>,
}

impl StateMask {
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn not_read() -> Self {
        Self { sample: Some(SampleState::NotRead), ..Default::default() }
    }

    fn matches_sample(&self, s: SampleState) -> bool {
        self.sample.is_none_or(|want| want == s)
    }

    fn matches_view(&self, v: ViewState) -> bool {
        self.view.is_none_or(|want| want == v)
    }

    fn matches_instance(&self, i: InstanceState) -> bool {
        self.instance.is_none_or(|want| want == i)
    }
}

/// A single sample in the history cache, shared by reference across proxy
/// queues and the cache's own per-instance list.
///
/// `c_wack` counts the matched reliable proxies that still haven't
/// acknowledged this change; the cache defers physical removal until it
/// reaches zero, mirroring the slab-handle refcounting in [`crate::pool`]
/// generalized from byte slabs to whole changes.
#[derive(Debug)]
pub struct Change {
    pub kind: ChangeKind,
    pub writer: Guid,
    pub seq: SequenceNumber,
    pub instance: InstanceHandle,
    pub source_timestamp: SystemTime,
    pub data: Arc<[u8]>,
    pub urgent: bool,
    pub no_multicast: bool,
    c_wack: AtomicUsize,
    read: AtomicBool,
    new: AtomicBool,
    taken: AtomicBool,
}

impl Change {
    #[must_use]
    pub fn new(
        kind: ChangeKind,
        writer: Guid,
        seq: SequenceNumber,
        instance: InstanceHandle,
        source_timestamp: SystemTime,
        data: Arc<[u8]>,
    ) -> Self {
        Self {
            kind,
            writer,
            seq,
            instance,
            source_timestamp,
            data,
            urgent: false,
            no_multicast: false,
            c_wack: AtomicUsize::new(0),
            read: AtomicBool::new(false),
            new: AtomicBool::new(true),
            taken: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }

    /// Register one more matched reliable proxy waiting to acknowledge this
    /// change.
    pub fn inc_wack(&self) {
        self.c_wack.fetch_add(1, Ordering::AcqRel);
    }

    /// Record one proxy acknowledgement; returns true once the count reaches
    /// zero, meaning the change is safe to free from the cache.
    pub fn dec_wack(&self) -> bool {
        let prev = self.c_wack.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
            Some(v.saturating_sub(1))
        });
        matches!(prev, Ok(1) | Ok(0))
    }

    #[must_use]
    pub fn outstanding_acks(&self) -> usize {
        self.c_wack.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn sample_state(&self) -> SampleState {
        if self.read.load(Ordering::Acquire) { SampleState::Read } else { SampleState::NotRead }
    }

    #[must_use]
    pub fn view_state(&self) -> ViewState {
        if self.new.load(Ordering::Acquire) { ViewState::New } else { ViewState::NotNew }
    }

    pub fn mark_read(&self) {
        self.read.store(true, Ordering::Release);
        self.new.store(false, Ordering::Release);
    }

    pub fn mark_taken(&self) {
        self.taken.store(true, Ordering::Release);
        self.mark_read();
    }

    #[must_use]
    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }

    /// A taken change can be physically dropped once no reliable proxy still
    /// needs it for retransmission accounting.
    #[must_use]
    pub fn is_collectible(&self) -> bool {
        self.is_taken() && self.outstanding_acks() == 0
    }

    fn matches(&self, mask: &StateMask, instance_state: InstanceState) -> bool {
        !self.is_taken()
            && mask.matches_sample(self.sample_state())
            && mask.matches_view(self.view_state())
            && mask.matches_instance(instance_state)
    }
}

pub(super) fn select<'a>(
    changes: impl Iterator<Item = &'a Arc<Change>>,
    mask: &StateMask,
    instance_state: InstanceState,
) -> Vec<Arc<Change>> {
    changes.filter(|c| c.matches(mask, instance_state)).cloned().collect()
}
