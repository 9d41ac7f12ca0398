// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! History cache: the per-endpoint ordered store of samples keyed by
//! instance, shared by writer-side (outgoing, pending ack) and reader-side
//! (incoming, pending read/take) endpoints.
//!
//! ```
//! use rtps_engine::cache::{HistoryCache, StateMask};
//! use rtps_engine::qos::{History, ResourceLimits};
//!
//! let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
//! assert_eq!(cache.len(), 0);
//! let taken = cache.take(StateMask::any());
//! assert!(taken.is_empty());
//! ```

mod change;

pub use change::{Change, ChangeKind, InstanceState, SampleState, StateMask, ViewState};

use crate::error::{Error, Result};
use crate::qos::{History, ResourceLimits, TimeBasedFilter};
use crate::types::{InstanceHandle, SequenceNumber};
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type WriterCallback = Box<dyn Fn(&Arc<Change>) + Send + Sync>;
type ReaderCallback = Box<dyn Fn() + Send + Sync>;

struct InstanceRecord {
    state: InstanceState,
    changes: VecDeque<Arc<Change>>,
    last_accepted: Option<Instant>,
}

impl InstanceRecord {
    fn new() -> Self {
        Self { state: InstanceState::Alive, changes: VecDeque::new(), last_accepted: None }
    }
}

/// Thread-safe, per-instance ordered store of [`Change`]s.
///
/// Used on both sides of an endpoint: a local writer's cache retains changes
/// until every matched reliable proxy has acknowledged them ([`Change::dec_wack`]);
/// a local reader's cache retains changes until the application `take`s them.
pub struct HistoryCache {
    instances: Mutex<HashMap<InstanceHandle, InstanceRecord>>,
    /// Writer-side index by the writer's own sequence number, used for
    /// ACKNACK/NACK_FRAG-driven retransmit lookups. A writer's changes share
    /// one sequence space across every instance it owns, so this index sits
    /// alongside the per-instance map rather than replacing it.
    by_seq: Mutex<BTreeMap<SequenceNumber, Arc<Change>>>,
    total_samples: AtomicUsize,
    limits: ResourceLimits,
    history: History,
    time_filter: Option<TimeBasedFilter>,
    /// How long a `KEEP_ALL` insert blocks waiting for room before giving up
    /// with [`Error::WouldBlock`]; zero means fail immediately. Set from
    /// [`crate::qos::Reliability::max_blocking_time`].
    max_blocking_time: Duration,
    /// Signaled by [`Self::purge_collectible`] whenever it frees capacity,
    /// waking blocked [`Self::insert`] callers.
    capacity_cv: Condvar,
    writer_cb: Mutex<Option<WriterCallback>>,
    reader_cb: Mutex<Option<ReaderCallback>>,
}

impl HistoryCache {
    #[must_use]
    pub fn new(limits: ResourceLimits, history: History) -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            by_seq: Mutex::new(BTreeMap::new()),
            total_samples: AtomicUsize::new(0),
            limits,
            history,
            time_filter: None,
            max_blocking_time: Duration::ZERO,
            capacity_cv: Condvar::new(),
            writer_cb: Mutex::new(None),
            reader_cb: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_time_based_filter(mut self, filter: TimeBasedFilter) -> Self {
        self.time_filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_max_blocking_time(mut self, max_blocking_time: Duration) -> Self {
        self.max_blocking_time = max_blocking_time;
        self
    }

    /// Install the writer-side notify callback, invoked on every accepted
    /// change, urgent change, and removal — drives `new_change` fan-out to
    /// matched proxies.
    pub fn monitor_start(&self, cb: WriterCallback) {
        *self.writer_cb.lock() = Some(cb);
    }

    pub fn monitor_end(&self) {
        *self.writer_cb.lock() = None;
    }

    /// Install the reader-side "cache regained capacity" unblock callback.
    pub fn inform_start(&self, cb: ReaderCallback) {
        *self.reader_cb.lock() = Some(cb);
    }

    pub fn inform_end(&self) {
        *self.reader_cb.lock() = None;
    }

    /// Writer-side add: unconditionally admits the change subject to
    /// resource limits, notifying [`monitor_start`]'s callback on success.
    pub fn add_inst(&self, change: Change, reliable: bool) -> Result<Arc<Change>> {
        self.insert(change, reliable, false)
    }

    /// Reader-side add: applies the time-based filter before admitting the
    /// change, then notifies [`inform_start`]'s callback when the cache
    /// transitions from full to having room. A `KEEP_ALL` writer blocked in
    /// [`Self::insert`] on this same cache wakes on that transition too; see
    /// [`Self::with_max_blocking_time`].
    pub fn add_received(&self, change: Change, reliable: bool) -> Result<Arc<Change>> {
        if let Some(filter) = self.time_filter {
            if !filter.is_disabled() {
                let instances = self.instances.lock();
                if let Some(rec) = instances.get(&change.instance) {
                    if let Some(last) = rec.last_accepted {
                        if last.elapsed() < filter.minimum_separation {
                            return Err(Error::InvalidState("sample rejected by time-based filter".into()));
                        }
                    }
                }
            }
        }
        self.insert(change, reliable, true)
    }

    fn insert(&self, change: Change, reliable: bool, touch_filter: bool) -> Result<Arc<Change>> {
        let kind = change.kind;
        let instance_key = change.instance;
        let arc = Arc::new(change);

        let mut instances = self.instances.lock();

        // KEEP_ALL capacity must be resolved before `entry()` borrows `instances`
        // mutably for the duration of this call — the blocking wait needs an
        // unencumbered `&mut MutexGuard` to hand to the condvar.
        if self.history == History::KeepAll {
            let deadline = Instant::now() + self.max_blocking_time;
            while self.total_samples.load(Ordering::Acquire) >= self.limits.max_samples {
                let now = Instant::now();
                if now >= deadline {
                    return Err(Error::WouldBlock);
                }
                self.capacity_cv.wait_for(&mut instances, deadline - now);
            }
        }

        let rec = instances.entry(instance_key).or_insert_with(InstanceRecord::new);

        if let History::KeepLast(depth) = self.history {
            while rec.changes.len() >= depth as usize {
                if let Some(evicted) = rec.changes.pop_front() {
                    self.total_samples.fetch_sub(1, Ordering::AcqRel);
                    self.by_seq.lock().remove(&evicted.seq);
                    drop(evicted);
                } else {
                    break;
                }
            }
        }

        if reliable {
            arc.inc_wack();
        }

        rec.state = match kind {
            ChangeKind::Alive => InstanceState::Alive,
            ChangeKind::Disposed => InstanceState::NotAliveDisposed,
            ChangeKind::Unregistered => InstanceState::NotAliveNoWriters,
        };
        if touch_filter {
            rec.last_accepted = Some(Instant::now());
        }
        rec.changes.push_back(Arc::clone(&arc));
        self.total_samples.fetch_add(1, Ordering::AcqRel);
        drop(instances);
        self.by_seq.lock().insert(arc.seq, Arc::clone(&arc));

        if let Some(cb) = self.writer_cb.lock().as_ref() {
            cb(&arc);
        }
        Ok(arc)
    }

    /// Writer-side retransmit lookup by the writer's own sequence number.
    #[must_use]
    pub fn find_by_seq(&self, seq: SequenceNumber) -> Option<Arc<Change>> {
        self.by_seq.lock().get(&seq).cloned()
    }

    /// Mark an instance disposed; future reads see `InstanceState::NotAliveDisposed`.
    pub fn dispose(&self, instance: InstanceHandle) {
        let mut instances = self.instances.lock();
        if let Some(rec) = instances.get_mut(&instance) {
            rec.state = InstanceState::NotAliveDisposed;
        }
    }

    /// Mark an instance as having no live writers.
    pub fn unregister(&self, instance: InstanceHandle) {
        let mut instances = self.instances.lock();
        if let Some(rec) = instances.get_mut(&instance) {
            rec.state = InstanceState::NotAliveNoWriters;
        }
    }

    /// Replay every retained change, in insertion order per instance, to a
    /// late-joining proxy.
    pub fn replay<F: FnMut(&Arc<Change>)>(&self, mut proxy_cb: F) {
        let instances = self.instances.lock();
        for rec in instances.values() {
            for change in &rec.changes {
                proxy_cb(change);
            }
        }
    }

    /// Non-destructive read: returns matching changes and marks them read,
    /// without removing them from the cache.
    #[must_use]
    pub fn read(&self, mask: StateMask) -> Vec<Arc<Change>> {
        let selected = self.select(mask);
        for c in &selected {
            c.mark_read();
        }
        selected
    }

    /// Destructive read: returns matching changes, marks them taken, and
    /// purges any that become collectible (taken with no outstanding acks).
    pub fn take(&self, mask: StateMask) -> Vec<Arc<Change>> {
        let selected = self.select(mask);
        for c in &selected {
            c.mark_taken();
        }
        self.purge_collectible();
        selected
    }

    fn select(&self, mask: StateMask) -> Vec<Arc<Change>> {
        let instances = self.instances.lock();
        let mut out = Vec::new();
        for rec in instances.values() {
            out.extend(change::select(rec.changes.iter(), &mask, rec.state));
        }
        out
    }

    fn purge_collectible(&self) {
        let was_full = self.total_samples.load(Ordering::Acquire) >= self.limits.max_samples;
        let mut instances = self.instances.lock();
        let mut removed = 0usize;
        let mut by_seq = self.by_seq.lock();
        for rec in instances.values_mut() {
            let before = rec.changes.len();
            rec.changes.retain(|c| {
                let keep = !c.is_collectible();
                if !keep {
                    by_seq.remove(&c.seq);
                }
                keep
            });
            removed += before - rec.changes.len();
        }
        drop(by_seq);
        drop(instances);
        if removed > 0 {
            self.total_samples.fetch_sub(removed, Ordering::AcqRel);
            self.capacity_cv.notify_all();
            if was_full {
                if let Some(cb) = self.reader_cb.lock().as_ref() {
                    cb();
                }
            }
        }
    }

    /// Record a proxy's acknowledgement of `seq`; once every proxy has
    /// acknowledged and the application has taken the sample, it is freed.
    pub fn ack_change(&self, change: &Arc<Change>) {
        change.dec_wack();
        self.purge_collectible();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.total_samples.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn instance_state(&self, instance: InstanceHandle) -> Option<InstanceState> {
        let instances = self.instances.lock();
        instances.get(&instance).map(|r| r.state)
    }

    /// Derive an instance handle from a type support's key hash bytes.
    /// Identity mapping: the engine already treats key hashes as opaque
    /// 16-byte handles (RTPS Sec.9.6.3.3).
    #[must_use]
    pub fn handle_from_key(key_hash: InstanceHandle) -> InstanceHandle {
        key_hash
    }

    /// Returns the instance handle if it is currently tracked by the cache.
    #[must_use]
    pub fn get_key(&self, instance: InstanceHandle) -> Option<InstanceHandle> {
        let instances = self.instances.lock();
        instances.contains_key(&instance).then_some(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Guid;
    use std::time::SystemTime;

    fn change(instance: InstanceHandle, seq: u64, kind: ChangeKind) -> Change {
        Change::new(kind, Guid::unknown(), seq, instance, SystemTime::now(), Arc::from(&b"x"[..]))
    }

    #[test]
    fn add_and_read_does_not_remove() {
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        cache.add_inst(change([1; 16], 1, ChangeKind::Alive), false).unwrap();
        let read1 = cache.read(StateMask::any());
        assert_eq!(read1.len(), 1);
        let read2 = cache.read(StateMask::not_read());
        assert!(read2.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn take_removes_from_cache_when_unacked() {
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        cache.add_inst(change([2; 16], 1, ChangeKind::Alive), false).unwrap();
        let taken = cache.take(StateMask::any());
        assert_eq!(taken.len(), 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn take_defers_removal_until_acked() {
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        let arc = cache.add_inst(change([3; 16], 1, ChangeKind::Alive), true).unwrap();
        assert_eq!(arc.outstanding_acks(), 1);
        cache.take(StateMask::any());
        assert_eq!(cache.len(), 1, "change must survive take until acked");
        cache.ack_change(&arc);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn keep_last_evicts_oldest_per_instance() {
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(2));
        for seq in 1..=3 {
            cache.add_inst(change([4; 16], seq, ChangeKind::Alive), false).unwrap();
        }
        assert_eq!(cache.len(), 2);
        let all = cache.read(StateMask::any());
        assert_eq!(all.iter().map(|c| c.seq).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn keep_all_rejects_past_max_samples() {
        let limits = ResourceLimits { max_samples: 2, ..ResourceLimits::default() };
        let cache = HistoryCache::new(limits, History::KeepAll);
        cache.add_inst(change([5; 16], 1, ChangeKind::Alive), false).unwrap();
        cache.add_inst(change([5; 16], 2, ChangeKind::Alive), false).unwrap();
        let err = cache.add_inst(change([5; 16], 3, ChangeKind::Alive), false).unwrap_err();
        assert!(matches!(err, Error::WouldBlock));
    }

    #[test]
    fn dispose_transitions_instance_state() {
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        cache.add_inst(change([6; 16], 1, ChangeKind::Alive), false).unwrap();
        cache.dispose([6; 16]);
        assert_eq!(cache.instance_state([6; 16]), Some(InstanceState::NotAliveDisposed));
    }

    #[test]
    fn time_based_filter_rejects_samples_too_close() {
        let filter = TimeBasedFilter::from_millis(1_000_000);
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10))
            .with_time_based_filter(filter);
        cache.add_received(change([7; 16], 1, ChangeKind::Alive), false).unwrap();
        let rejected = cache.add_received(change([7; 16], 2, ChangeKind::Alive), false);
        assert!(rejected.is_err());
    }

    #[test]
    fn monitor_callback_fires_on_insert() {
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        cache.monitor_start(Box::new(move |_c| {
            seen_clone.fetch_add(1, Ordering::Relaxed);
        }));
        cache.add_inst(change([8; 16], 1, ChangeKind::Alive), false).unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn get_key_reflects_presence() {
        let cache = HistoryCache::new(ResourceLimits::default(), History::KeepLast(10));
        assert_eq!(cache.get_key([9; 16]), None);
        cache.add_inst(change([9; 16], 1, ChangeKind::Alive), false).unwrap();
        assert_eq!(cache.get_key([9; 16]), Some([9; 16]));
    }

    #[test]
    fn keep_all_blocks_then_succeeds_once_room_is_freed() {
        let limits = ResourceLimits { max_samples: 1, ..ResourceLimits::default() };
        let cache = Arc::new(
            HistoryCache::new(limits, History::KeepAll).with_max_blocking_time(Duration::from_secs(5)),
        );
        cache.add_inst(change([10; 16], 1, ChangeKind::Alive), false).unwrap();
        assert_eq!(cache.len(), 1);

        let blocked = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.add_inst(change([10; 16], 2, ChangeKind::Alive), false))
        };

        std::thread::sleep(Duration::from_millis(20));
        cache.take(StateMask::any());

        let result = blocked.join().unwrap();
        assert!(result.is_ok(), "blocked insert must succeed once the cache frees a slot");
    }

    #[test]
    fn keep_all_blocking_insert_times_out() {
        let limits = ResourceLimits { max_samples: 1, ..ResourceLimits::default() };
        let cache =
            HistoryCache::new(limits, History::KeepAll).with_max_blocking_time(Duration::from_millis(20));
        cache.add_inst(change([11; 16], 1, ChangeKind::Alive), false).unwrap();

        let started = Instant::now();
        let err = cache.add_inst(change([11; 16], 2, ChangeKind::Alive), false).unwrap_err();
        assert!(matches!(err, Error::WouldBlock));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
