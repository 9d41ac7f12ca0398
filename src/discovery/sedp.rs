// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SEDP: publication/subscription endpoint discovery registry.

use crate::qos::QosProfile;
use crate::types::{Guid, Locator};
use dashmap::DashMap;

/// Decoded SEDP endpoint announcement (one per discovered reader or
/// writer). As with [`super::participant::SpdpData`], the PID-based wire
/// encoding is a message-layer concern; this is the decoded shape.
#[derive(Debug, Clone)]
pub struct SedpData {
    pub endpoint_guid: Guid,
    pub participant_guid: Guid,
    pub topic_name: String,
    pub type_name: String,
    pub qos: QosProfile,
    pub unicast_locators: Vec<Locator>,
    pub is_writer: bool,
}

/// Discovered remote endpoints (both publications and subscriptions),
/// keyed by endpoint GUID.
#[derive(Default)]
pub struct EndpointRegistry {
    endpoints: DashMap<Guid, SedpData>,
}

impl EndpointRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce or re-announce an endpoint. Returns the previous entry, if
    /// any — the caller uses this to detect a same-GUID endpoint that moved
    /// participants (treated as remove+add, per SPEC_FULL.md Sec.4.6).
    pub fn announce(&self, data: SedpData) -> Option<SedpData> {
        self.endpoints.insert(data.endpoint_guid, data)
    }

    #[must_use]
    pub fn get(&self, guid: &Guid) -> Option<SedpData> {
        self.endpoints.get(guid).map(|e| e.clone())
    }

    pub fn remove(&self, guid: &Guid) -> Option<SedpData> {
        self.endpoints.remove(guid).map(|(_, v)| v)
    }

    #[must_use]
    pub fn writers_for_topic(&self, topic: &str) -> Vec<SedpData> {
        self.endpoints.iter().filter(|e| e.is_writer && e.topic_name == topic).map(|e| e.clone()).collect()
    }

    #[must_use]
    pub fn readers_for_topic(&self, topic: &str) -> Vec<SedpData> {
        self.endpoints.iter().filter(|e| !e.is_writer && e.topic_name == topic).map(|e| e.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
