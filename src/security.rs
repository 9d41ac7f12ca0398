// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pass-through security hooks (DDS Security Sec.8, authentication + access
//! control decision points only).
//!
//! This crate does not ship a cryptographic security plugin: no X.509
//! handshake, no AES-GCM payload encryption. [`SecurityHooks`] is the seam a
//! concrete plugin would implement; [`AllowAll`] is the default that admits
//! every participant and endpoint unconditionally, which is what every
//! engine built against this crate gets until a hooks implementation is
//! supplied.

use crate::qos::QosProfile;
use crate::types::Guid;

/// Authentication and access-control decision points a concrete security
/// plugin implements. Mirrors the two DDS Security plugin categories this
/// crate carries as a pass-through: identity validation (`validate_*`) and
/// permission checks (`check_*`). Cryptographic transform and key exchange
/// are not part of this trait — a real plugin would layer those in its own
/// `Transport` wrapper rather than here.
pub trait SecurityHooks: Send + Sync {
    /// Validate a remote participant's identity token from SPDP. An `Err`
    /// rejects the participant before it is added to discovery.
    fn validate_remote_identity(&self, participant: Guid, identity_token: &[u8]) -> Result<(), String> {
        let _ = (participant, identity_token);
        Ok(())
    }

    /// Check whether a local writer may be created for `topic` with `qos`.
    fn check_create_writer(&self, topic: &str, qos: &QosProfile) -> Result<(), String> {
        let _ = (topic, qos);
        Ok(())
    }

    /// Check whether a local reader may be created for `topic` with `qos`.
    fn check_create_reader(&self, topic: &str, qos: &QosProfile) -> Result<(), String> {
        let _ = (topic, qos);
        Ok(())
    }

    /// Check whether a discovered remote writer may be matched against.
    fn check_peer_writer(&self, participant: Guid, topic: &str) -> Result<(), String> {
        let _ = (participant, topic);
        Ok(())
    }

    /// Check whether a discovered remote reader may be matched against.
    fn check_peer_reader(&self, participant: Guid, topic: &str) -> Result<(), String> {
        let _ = (participant, topic);
        Ok(())
    }
}

/// Default [`SecurityHooks`] impl: every check passes. Used when no
/// security plugin is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SecurityHooks for AllowAll {}

#[cfg(test)]
mod tests {
    use super::*;

    struct DenyTopic(&'static str);

    impl SecurityHooks for DenyTopic {
        fn check_create_writer(&self, topic: &str, _qos: &QosProfile) -> Result<(), String> {
            if topic == self.0 {
                Err(format!("topic '{topic}' denied"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn allow_all_accepts_everything() {
        let hooks = AllowAll;
        assert!(hooks.validate_remote_identity(Guid::unknown(), &[]).is_ok());
        assert!(hooks.check_create_writer("any.topic", &QosProfile::default()).is_ok());
        assert!(hooks.check_peer_reader(Guid::unknown(), "any.topic").is_ok());
    }

    #[test]
    fn custom_hooks_can_deny() {
        let hooks = DenyTopic("restricted");
        assert!(hooks.check_create_writer("restricted", &QosProfile::default()).is_err());
        assert!(hooks.check_create_writer("open", &QosProfile::default()).is_ok());
    }
}
