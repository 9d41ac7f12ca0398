// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Locator registry: deduplicated, reference-counted locator nodes shared
//! across proxies, endpoints, and participants.
//!
//! The original C implementation (`dds/src/dds/locator.c`) keeps a global
//! `Skiplist_t` ordered by `(kind, address, port)` protected by a single
//! lock, because that was the available concurrent ordered-set primitive at
//! the time. The key is not used for range queries anywhere in the engine —
//! only point lookups and dedup — so this port uses a `HashMap` behind a
//! `parking_lot::Mutex` instead: same O(1) amortized dedup, no ordering
//! machinery to maintain.
//!
//! A [`LocatorRef`] is a cheap `Arc` clone of an interned [`LocatorNode`];
//! holding one keeps the node's user count above zero. A caller-owned
//! [`LocatorList`] is a plain `Vec` of such refs — list iteration never
//! touches the registry lock.

use crate::types::{Locator, LocatorFlags, LocatorKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

/// An interned locator plus its live reference count. `flags` is split out
/// into its own atomic (rather than living on an immutable `Locator`) so
/// [`LocatorRegistry::add`] can merge a duplicate's flags into the shared
/// node without replacing it.
pub struct LocatorNode {
    kind: LocatorKind,
    port: u32,
    address: [u8; 16],
    flags: AtomicU16,
    users: AtomicUsize,
}

impl LocatorNode {
    #[must_use]
    pub fn users(&self) -> usize {
        self.users.load(Ordering::Relaxed)
    }

    /// Reconstruct the node's current `Locator` value, flags included.
    #[must_use]
    pub fn locator(&self) -> Locator {
        Locator::new(self.kind, self.port, self.address)
            .with_flags(LocatorFlags::from_bits(self.flags.load(Ordering::Relaxed)))
    }

    fn merge_flags(&self, flags: LocatorFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::Relaxed);
    }
}

/// A live reference into the registry. Cloning is cheap (`Arc::clone`);
/// dropping the last clone does not itself evict the node — eviction only
/// happens through [`LocatorRegistry::delete`], matching the original's
/// explicit `loc_unref` semantics rather than an implicit `Drop`-driven GC,
/// since a list can be rebuilt from a snapshot without touching the
/// registry at all.
pub type LocatorRef = Arc<LocatorNode>;

/// An ordered collection of locator refs owned by a proxy, endpoint, or
/// participant.
pub type LocatorList = Vec<LocatorRef>;

fn key_of(loc: &Locator) -> (i32, u32, [u8; 16]) {
    (loc.kind.to_wire(), loc.port, loc.address)
}

/// Domain-global interning table for [`Locator`] values.
#[derive(Default)]
pub struct LocatorRegistry {
    index: Mutex<HashMap<(i32, u32, [u8; 16]), LocatorRef>>,
}

impl LocatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `locator`, merging flags into any existing node for the same
    /// `(kind, address, port)`, and return a ref with an incremented user
    /// count.
    pub fn add(&self, locator: Locator) -> LocatorRef {
        let key = key_of(&locator);
        let mut index = self.index.lock();
        if let Some(existing) = index.get(&key) {
            existing.users.fetch_add(1, Ordering::Relaxed);
            existing.merge_flags(locator.flags);
            return existing.clone();
        }
        let node = Arc::new(LocatorNode {
            kind: locator.kind,
            port: locator.port,
            address: locator.address,
            flags: AtomicU16::new(locator.flags.bits()),
            users: AtomicUsize::new(1),
        });
        index.insert(key, node.clone());
        node
    }

    /// Release one reference to `node`. When the user count reaches zero the
    /// node is removed from the registry.
    pub fn delete(&self, node: &LocatorRef) {
        if node.users.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        let key = (node.kind.to_wire(), node.port, node.address);
        let mut index = self.index.lock();
        // Re-check under the lock: another thread may have re-added the
        // same locator (and bumped users back up) between the fetch_sub
        // above and acquiring the lock here.
        if let Some(current) = index.get(&key) {
            if Arc::ptr_eq(current, node) && current.users() == 0 {
                index.remove(&key);
            }
        }
    }

    /// Append a clone of every ref in `src` into `dst`, bumping user counts.
    pub fn append(&self, dst: &mut LocatorList, src: &LocatorList) {
        for r in src {
            r.users.fetch_add(1, Ordering::Relaxed);
            dst.push(r.clone());
        }
    }

    /// Number of distinct locators currently interned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.lock().is_empty()
    }
}

/// Value equality between two locators, ignoring any registry bookkeeping.
#[must_use]
pub fn locators_equal(a: &Locator, b: &Locator) -> bool {
    key_of(a) == key_of(b)
}
