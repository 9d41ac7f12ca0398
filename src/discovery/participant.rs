// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SPDP: participant discovery registry and lease tracking.

use crate::types::{Guid, Locator};
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Decoded SPDP participant announcement. The wire parameter-list encoding
/// (PID_PARTICIPANT_GUID, PID_PARTICIPANT_LEASE_DURATION, etc.) is handled
/// by the message layer's inline-QoS parameter list; this is what's left
/// once that's decoded.
#[derive(Debug, Clone)]
pub struct SpdpData {
    pub participant_guid: Guid,
    pub lease_duration: Duration,
    pub metatraffic_unicast_locators: Vec<Locator>,
    pub default_unicast_locators: Vec<Locator>,
    pub metatraffic_multicast_locators: Vec<Locator>,
    pub default_multicast_locators: Vec<Locator>,
}

struct DiscoveredParticipant {
    data: SpdpData,
    last_seen: Instant,
}

/// Discovered remote participants, keyed by participant GUID.
#[derive(Default)]
pub struct ParticipantRegistry {
    participants: DashMap<Guid, DiscoveredParticipant>,
}

impl ParticipantRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an SPDP announcement. Returns `true` the first time this
    /// participant is seen; later announcements refresh the lease and QoS
    /// in place without being reported as new.
    pub fn on_spdp(&self, data: SpdpData) -> bool {
        let guid = data.participant_guid;
        let is_new = !self.participants.contains_key(&guid);
        self.participants.insert(guid, DiscoveredParticipant { data, last_seen: Instant::now() });
        is_new
    }

    #[must_use]
    pub fn get(&self, guid: &Guid) -> Option<SpdpData> {
        self.participants.get(guid).map(|p| p.data.clone())
    }

    /// Participants whose lease elapsed (1.5x grace, matching the
    /// writer/reader proxy lease convention used elsewhere in this crate),
    /// removed as a side effect.
    pub fn expire(&self) -> Vec<Guid> {
        let expired: Vec<Guid> = self
            .participants
            .iter()
            .filter(|p| p.last_seen.elapsed() > p.data.lease_duration.mul_f32(1.5))
            .map(|p| *p.key())
            .collect();
        for guid in &expired {
            self.participants.remove(guid);
        }
        expired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
