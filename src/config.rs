// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layered engine configuration.
//!
//! - **Level 1 (static)**: compile-time RTPS constants (ports, timing
//!   defaults, protocol version) that the wire protocol and discovery
//!   modules reference directly.
//! - **Level 2 (dynamic)**: [`RuntimeConfig`], a lock-free key/value store
//!   for QoS profile overrides plus an optional port-mapping override,
//!   populated programmatically or (behind the `qos-loaders` feature) from
//!   an XML/YAML profile file.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;

// ===========================================================================
// Level 1: static RTPS constants (OMG DDS-RTPS v2.3 Sec.9.6.1.1)
// ===========================================================================

/// RTPS well-known base port.
pub const PORT_BASE: u16 = 7400;

/// Maximum valid domain id.
pub const MAX_DOMAIN_ID: u32 = 232;

/// Per-domain port offset.
pub const DOMAIN_ID_GAIN: u16 = 250;

/// Per-participant port offset.
pub const PARTICIPANT_ID_GAIN: u16 = 2;

/// Metatraffic (discovery) unicast offset.
pub const SEDP_UNICAST_OFFSET: u16 = 10;

/// User-data unicast offset.
pub const USER_UNICAST_OFFSET: u16 = 11;

/// Default SPDP multicast group.
pub const SPDP_MULTICAST_IP: [u8; 4] = [239, 255, 0, 1];

/// Default SPDP announcement period.
pub const SPDP_ANNOUNCEMENT_PERIOD_MS: u64 = 3_000;

/// Default participant lease: 10x the announcement period.
pub const PARTICIPANT_LEASE_DURATION_MS: u64 = 30_000;

/// Default HEARTBEAT period for a stateful reliable writer.
pub const HEARTBEAT_PERIOD_MS: u64 = 200;

/// Default delay a reliable reader waits before responding to a HEARTBEAT.
pub const HEARTBEAT_RESPONSE_DELAY_MS: u64 = 20;

/// Minimum spacing between ACKNACKs sent for the same writer (suppression).
pub const NACK_SUPPRESSION_DURATION_MS: u64 = 20;

/// Default resend period for a stateless reliable writer.
pub const STATELESS_RESEND_PERIOD_MS: u64 = 50;

/// Default retry ceiling for a stateless reliable writer.
pub const STATELESS_MAX_RETRIES: u32 = 5;

/// RTPS protocol version advertised by this engine.
pub const PROTOCOL_VERSION: (u8, u8) = (2, 1);

/// Largest payload a writer sends as a single DATA submessage before
/// switching to DATA_FRAG; `RTPS_MsgSize` in a runtime profile overrides it.
pub const MAX_MSG_SIZE_BYTES: usize = 1_456;

/// Size of each fragment a writer produces once a change exceeds
/// [`MAX_MSG_SIZE_BYTES`]; `RTPS_FragSize` in a runtime profile overrides it.
pub const FRAG_SIZE_BYTES: u16 = 1_344;

/// Fragments sent per burst before pausing [`FRAG_BURST_DELAY_MS`];
/// `RTPS_FragBurst` in a runtime profile overrides it.
pub const FRAG_BURST_SIZE: u32 = 8;

/// Pause between fragment bursts, pacing large transfers so they don't
/// overrun receiver buffers; `RTPS_FragDelay` in a runtime profile overrides it.
pub const FRAG_BURST_DELAY_MS: u64 = 10;

/// Compute the SPDP multicast port for a domain.
#[must_use]
pub fn spdp_multicast_port(domain_id: u32) -> u16 {
    PORT_BASE + DOMAIN_ID_GAIN * domain_id as u16
}

/// Compute the SEDP metatraffic unicast port for a domain/participant pair.
#[must_use]
pub fn sedp_unicast_port(domain_id: u32, participant_id: u8) -> u16 {
    PORT_BASE
        + SEDP_UNICAST_OFFSET
        + DOMAIN_ID_GAIN * domain_id as u16
        + PARTICIPANT_ID_GAIN * u16::from(participant_id)
}

/// Compute the user-data unicast port for a domain/participant pair.
#[must_use]
pub fn user_unicast_port(domain_id: u32, participant_id: u8) -> u16 {
    PORT_BASE
        + USER_UNICAST_OFFSET
        + DOMAIN_ID_GAIN * domain_id as u16
        + PARTICIPANT_ID_GAIN * u16::from(participant_id)
}

// ===========================================================================
// Level 2: dynamic runtime config
// ===========================================================================

/// Explicit port overrides, replacing the formula-derived defaults above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub spdp_multicast: u16,
    pub sedp_unicast: u16,
    pub user_unicast: u16,
}

/// Lock-free runtime configuration shared across a participant's endpoints.
///
/// Reads are wait-free (`ArcSwap` load / `DashMap` get); writes take a
/// per-shard lock internal to `DashMap` and never block a reader.
#[derive(Clone)]
pub struct RuntimeConfig {
    port_mapping: Arc<ArcSwap<Option<PortMapping>>>,
    qos_overrides: Arc<DashMap<Arc<str>, Arc<str>>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            port_mapping: Arc::new(ArcSwap::new(Arc::new(None))),
            qos_overrides: Arc::new(DashMap::new()),
        }
    }

    pub fn set_port_mapping(&self, mapping: PortMapping) {
        self.port_mapping.store(Arc::new(Some(mapping)));
    }

    #[must_use]
    pub fn port_mapping(&self) -> Option<PortMapping> {
        *self.port_mapping.load_full()
    }

    pub fn clear_port_mapping(&self) {
        self.port_mapping.store(Arc::new(None));
    }

    pub fn set_qos(&self, key: &str, value: &str) {
        self.qos_overrides.insert(Arc::from(key), Arc::from(value));
    }

    #[must_use]
    pub fn get_qos(&self, key: &str) -> Option<Arc<str>> {
        self.qos_overrides.get(key).map(|v| v.clone())
    }

    #[must_use]
    pub fn qos_prefix(&self, prefix: &str) -> Vec<(Arc<str>, Arc<str>)> {
        self.qos_overrides
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.qos_overrides.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.qos_overrides.is_empty()
    }
}

/// QoS profile loading from XML/YAML profile files.
#[cfg(feature = "qos-loaders")]
pub mod profile {
    use super::RuntimeConfig;
    use crate::error::{Error, Result};
    use std::path::Path;

    /// Load `key: value` QoS overrides from a YAML profile and apply them to
    /// `config`. Intended for the flat `reliability.kind: RELIABLE` style
    /// profiles produced by the teacher's QoS-loader tooling.
    pub fn load_yaml_profile(config: &RuntimeConfig, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| Error::ConfigFileNotFound(path.display().to_string()))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&text)
            .map_err(|e| Error::ConfigParseError(e.to_string()))?;
        apply_mapping(config, "", &value);
        Ok(())
    }

    /// Load QoS overrides out of an XML `<qos_profile>` document using a
    /// tolerant tree walk (element name -> dotted key, text content -> value).
    pub fn load_xml_profile(config: &RuntimeConfig, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| Error::ConfigFileNotFound(path.display().to_string()))?;
        let doc = roxmltree::Document::parse(&text)
            .map_err(|e| Error::ConfigParseError(e.to_string()))?;
        apply_xml_node(config, "", doc.root_element());
        Ok(())
    }

    fn apply_mapping(config: &RuntimeConfig, prefix: &str, value: &serde_yaml::Value) {
        match value {
            serde_yaml::Value::Mapping(map) => {
                for (k, v) in map {
                    let Some(k) = k.as_str() else { continue };
                    let key = if prefix.is_empty() {
                        k.to_string()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    apply_mapping(config, &key, v);
                }
            }
            serde_yaml::Value::String(s) => config.set_qos(prefix, s),
            serde_yaml::Value::Number(n) => config.set_qos(prefix, &n.to_string()),
            serde_yaml::Value::Bool(b) => config.set_qos(prefix, &b.to_string()),
            _ => {}
        }
    }

    fn apply_xml_node(config: &RuntimeConfig, prefix: &str, node: roxmltree::Node) {
        let key = if prefix.is_empty() {
            node.tag_name().name().to_string()
        } else {
            format!("{prefix}.{}", node.tag_name().name())
        };
        if node.children().all(|c| !c.is_element()) {
            if let Some(text) = node.text() {
                let text = text.trim();
                if !text.is_empty() {
                    config.set_qos(&key, text);
                }
            }
            return;
        }
        for child in node.children().filter(|c| c.is_element()) {
            apply_xml_node(config, &key, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_formula_matches_domain_zero_defaults() {
        assert_eq!(spdp_multicast_port(0), PORT_BASE);
        assert_eq!(sedp_unicast_port(0, 0), PORT_BASE + SEDP_UNICAST_OFFSET);
        assert_eq!(user_unicast_port(0, 0), PORT_BASE + USER_UNICAST_OFFSET);
    }

    #[test]
    fn port_formula_advances_with_domain_and_participant() {
        assert_eq!(spdp_multicast_port(1), PORT_BASE + DOMAIN_ID_GAIN);
        assert_eq!(
            user_unicast_port(1, 2),
            PORT_BASE + USER_UNICAST_OFFSET + DOMAIN_ID_GAIN + 2 * PARTICIPANT_ID_GAIN
        );
    }

    #[test]
    fn runtime_config_roundtrips_qos_overrides() {
        let cfg = RuntimeConfig::new();
        assert!(cfg.is_empty());
        cfg.set_qos("reliability.kind", "RELIABLE");
        cfg.set_qos("reliability.max_blocking_time_ms", "100");
        assert_eq!(cfg.get_qos("reliability.kind").as_deref(), Some("RELIABLE"));
        assert_eq!(cfg.qos_prefix("reliability.").len(), 2);
    }

    #[test]
    fn port_mapping_overrides_clear() {
        let cfg = RuntimeConfig::new();
        assert!(cfg.port_mapping().is_none());
        cfg.set_port_mapping(PortMapping {
            spdp_multicast: 9999,
            sedp_unicast: 10000,
            user_unicast: 10001,
        });
        assert_eq!(cfg.port_mapping().unwrap().spdp_multicast, 9999);
        cfg.clear_port_mapping();
        assert!(cfg.port_mapping().is_none());
    }
}
