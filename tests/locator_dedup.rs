// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interning the same multicast locator into two distinct proxies yields one
//! registry node shared between them, with a user count reflecting both refs.

use rtps_engine::locator_registry::LocatorRegistry;
use rtps_engine::types::{Locator, LocatorKind};
use std::sync::Arc;

fn spdp_multicast() -> Locator {
    Locator::new(LocatorKind::UdpV4, 7400, [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 239, 255, 0, 1])
}

#[test]
fn two_proxies_sharing_a_locator_produce_one_node_with_two_users() {
    let registry = LocatorRegistry::new();

    let mut proxy_a_locators = Vec::new();
    let mut proxy_b_locators = Vec::new();

    proxy_a_locators.push(registry.add(spdp_multicast()));
    proxy_b_locators.push(registry.add(spdp_multicast()));

    assert_eq!(registry.len(), 1, "the same {{kind, address, port}} must intern to a single node");
    assert!(Arc::ptr_eq(&proxy_a_locators[0], &proxy_b_locators[0]));
    assert_eq!(proxy_a_locators[0].users(), 2);

    // Releasing one proxy's reference must not evict the node while the
    // other proxy still holds it.
    registry.delete(&proxy_a_locators[0]);
    assert_eq!(registry.len(), 1);
    registry.delete(&proxy_b_locators[0]);
    assert_eq!(registry.len(), 0, "the node is evicted once both proxies release it");
}

#[test]
fn distinct_locators_never_share_a_node() {
    let registry = LocatorRegistry::new();
    let unicast = Locator::new(LocatorKind::UdpV4, 7410, [0; 16]);
    let multicast = spdp_multicast();

    let a = registry.add(unicast);
    let b = registry.add(multicast);

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len(), 2);
}
