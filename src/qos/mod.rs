// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS (Quality of Service) policies for DataWriter and DataReader.
//!
//! # Supported Policies
//!
//! - **Reliability**: BestEffort or Reliable (NACK-driven retransmission),
//!   with a `max_blocking_time` bounding how long a full `KEEP_ALL` cache
//!   blocks a write waiting for room.
//! - **History**: KeepLast(n) bounded queue, KeepAll within ResourceLimits
//! - **Durability**: Volatile, TransientLocal, Transient, Persistent
//! - **ResourceLimits**: max_samples, max_instances, max_samples_per_instance
//! - **Deadline**, **Lifespan**, **Liveliness**, **Ownership**, **Partition**,
//!   **TimeBasedFilter**, **DestinationOrder**, **DurabilityService** — see
//!   their respective submodules.
//!
//! # Examples
//!
//! ```no_run
//! use rtps_engine::qos::{QosProfile, History, ResourceLimits};
//!
//! let qos_default = QosProfile::default();
//!
//! let qos_custom = QosProfile {
//!     history: History::KeepLast(100),
//!     resource_limits: ResourceLimits {
//!         max_samples: 500,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! ```

/// Deadline QoS policy - expected data update period.
pub mod deadline;
/// Destination order QoS policy - reception vs source timestamp ordering.
pub mod destination_order;
/// Durability service QoS policy - history depth for late joiners.
pub mod durability_service;
/// Lifespan QoS policy - data expiration time.
pub mod lifespan;
/// Liveliness QoS policy - writer aliveness assertions.
pub mod liveliness;
/// Ownership QoS policy - exclusive vs shared writers.
pub mod ownership;
/// Partition QoS policy - logical data separation.
pub mod partition;
/// Time-based filter QoS policy - minimum sample separation.
pub mod time_based_filter;

pub use deadline::Deadline;
pub use destination_order::DestinationOrder;
pub use durability_service::DurabilityService;
pub use lifespan::Lifespan;
pub use liveliness::Liveliness;
pub use ownership::{Ownership, OwnershipKind, OwnershipStrength};
pub use partition::Partition;
pub use time_based_filter::TimeBasedFilter;

use std::time::Duration;

/// QoS Profile - Collection of policies for Writer/Reader.
///
/// Validated at Writer/Reader creation (fail-fast on invalid config).
#[derive(Clone, Debug, PartialEq)]
pub struct QosProfile {
    pub reliability: Reliability,
    pub history: History,
    pub durability: Durability,
    pub resource_limits: ResourceLimits,
    pub deadline: Deadline,
    pub lifespan: Lifespan,
    pub liveliness: Liveliness,
    pub ownership: Ownership,
    pub partition: Partition,
    pub time_based_filter: TimeBasedFilter,
    pub destination_order: DestinationOrder,
    /// Stateful vs stateless writer construction; see [`WriterBinding`].
    pub writer_binding: WriterBinding,
}

impl Default for QosProfile {
    fn default() -> Self {
        Self {
            reliability: Reliability::default(),
            history: History::KeepLast(10),
            durability: Durability::Volatile,
            resource_limits: ResourceLimits::default(),
            deadline: Deadline::default(),
            lifespan: Lifespan::default(),
            liveliness: Liveliness::default(),
            ownership: Ownership::default(),
            partition: Partition::default(),
            time_based_filter: TimeBasedFilter::default(),
            destination_order: DestinationOrder::default(),
            writer_binding: WriterBinding::default(),
        }
    }
}

impl QosProfile {
    /// Validate QoS configuration.
    ///
    /// # Validation Rules
    ///
    /// - `History::KeepLast(n)` where `n > 0`
    /// - `History::KeepAll` requires `ResourceLimits.max_samples > 0`
    /// - `max_samples >= max_samples_per_instance * max_instances`
    pub fn validate(&self) -> Result<(), String> {
        match self.history {
            History::KeepLast(0) => {
                return Err("History::KeepLast(n) requires n > 0".to_string());
            }
            History::KeepAll => {
                if self.resource_limits.max_samples == 0 {
                    return Err(
                        "History::KeepAll requires ResourceLimits.max_samples > 0".to_string()
                    );
                }
            }
            History::KeepLast(_) => {}
        }

        let rl = &self.resource_limits;
        if rl.max_samples < rl.max_samples_per_instance * rl.max_instances {
            return Err(format!(
                "max_samples ({}) must be >= max_samples_per_instance ({}) * max_instances ({})",
                rl.max_samples, rl.max_samples_per_instance, rl.max_instances
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn low_latency() -> Self {
        Self {
            reliability: Reliability::best_effort(),
            history: History::KeepLast(1),
            durability: Durability::Volatile,
            resource_limits: ResourceLimits {
                max_samples: 10,
                max_instances: 1,
                max_samples_per_instance: 10,
                max_quota_bytes: 100_000,
            },
            ..Default::default()
        }
    }

    #[must_use]
    pub fn high_throughput() -> Self {
        Self {
            reliability: Reliability::best_effort(),
            history: History::KeepLast(1000),
            durability: Durability::Volatile,
            resource_limits: ResourceLimits {
                max_samples: 5000,
                max_instances: 1,
                max_samples_per_instance: 5000,
                max_quota_bytes: 50_000_000,
            },
            ..Default::default()
        }
    }

    /// Check writer-offered vs reader-requested (RxO) compatibility across
    /// every policy that participates in request/offered matching.
    /// `DurabilityService` is intentionally excluded — it shapes the writer's
    /// history cache, not reader/writer compatibility.
    #[must_use]
    pub fn is_compatible_with(&self, requested: &QosProfile) -> Vec<Incompatibility> {
        let mut reasons = Vec::new();
        if self.reliability.kind < requested.reliability.kind {
            reasons.push(Incompatibility::Reliability);
        }
        if self.durability < requested.durability {
            reasons.push(Incompatibility::Durability);
        }
        if !self.deadline.is_compatible_with(&requested.deadline) {
            reasons.push(Incompatibility::Deadline);
        }
        if !self.lifespan.is_compatible_with(&requested.lifespan) {
            reasons.push(Incompatibility::Lifespan);
        }
        if !self.liveliness.is_compatible_with(&requested.liveliness) {
            reasons.push(Incompatibility::Liveliness);
        }
        if !self.ownership.is_compatible_with(&requested.ownership) {
            reasons.push(Incompatibility::Ownership);
        }
        if !self.partition.is_compatible_with(&requested.partition) {
            reasons.push(Incompatibility::Partition);
        }
        if !self.destination_order.is_compatible_with(&requested.destination_order) {
            reasons.push(Incompatibility::DestinationOrder);
        }
        reasons
    }
}

/// A single RxO policy mismatch, returned from [`QosProfile::is_compatible_with`]
/// so the caller can report `OFFERED_INCOMPATIBLE_QOS` with the right policy id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incompatibility {
    Reliability,
    Durability,
    Deadline,
    Lifespan,
    Liveliness,
    Ownership,
    Partition,
    DestinationOrder,
}

/// Reliability kind, ordered so `self >= requested` implements RxO directly.
/// Kept separate from [`Reliability`] so `max_blocking_time` never leaks
/// into that comparison — two reliable endpoints with different blocking
/// budgets are still compatible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReliabilityKind {
    /// Fire-and-forget (no ACKs, no retransmission).
    #[default]
    BestEffort,
    /// Reliable delivery with NACK-driven retransmission.
    Reliable,
}

/// Reliability policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reliability {
    pub kind: ReliabilityKind,
    /// How long a `KEEP_ALL` writer blocks a write against a full cache
    /// before giving up with [`crate::error::Error::WouldBlock`]. Zero
    /// means fail immediately, matching the pre-existing best-effort
    /// behavior.
    pub max_blocking_time: Duration,
}

impl Reliability {
    #[must_use]
    pub const fn best_effort() -> Self {
        Self { kind: ReliabilityKind::BestEffort, max_blocking_time: Duration::ZERO }
    }

    #[must_use]
    pub const fn reliable(max_blocking_time: Duration) -> Self {
        Self { kind: ReliabilityKind::Reliable, max_blocking_time }
    }
}

impl Default for Reliability {
    fn default() -> Self {
        Self::best_effort()
    }
}

/// History policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum History {
    /// Keep last N samples (bounded queue, drops oldest).
    KeepLast(u32),
    /// Keep all samples within resource limits.
    KeepAll,
}

impl Default for History {
    fn default() -> Self {
        Self::KeepLast(10)
    }
}

/// Durability policy. Ordered so `self >= requested` implements RxO directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Durability {
    #[default]
    Volatile,
    TransientLocal,
    /// Survives writer restart, backed by an external persistence service
    /// rather than the writer's own process lifetime (see `TransientLocal`,
    /// which only survives within it).
    Transient,
    Persistent,
}

/// Whether a writer's entity-creation path builds a stateful (per-reader
/// proxy) or stateless (fixed-destination) writer. Most user data writers
/// are stateful; stateless is for fixed-destination traffic such as SPDP's
/// own writer, which addresses a multicast group rather than discovered
/// readers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WriterBinding {
    #[default]
    Stateful,
    Stateless,
}

/// Resource limits for Writer/Reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_samples: usize,
    pub max_instances: usize,
    pub max_samples_per_instance: usize,
    pub max_quota_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_samples: 100_000,
            max_instances: 1,
            max_samples_per_instance: 100_000,
            max_quota_bytes: 100_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_default() {
        let qos = QosProfile::default();
        assert_eq!(qos.reliability, Reliability::best_effort());
        assert_eq!(qos.history, History::KeepLast(10));
        assert_eq!(qos.durability, Durability::Volatile);
        assert_eq!(qos.resource_limits.max_samples, 100_000);
    }

    #[test]
    fn test_qos_validate_invalid_history_zero() {
        let qos = QosProfile { history: History::KeepLast(0), ..Default::default() };
        let result = qos.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("History::KeepLast(n) requires n > 0"));
    }

    #[test]
    fn test_qos_validate_resource_limits() {
        let qos = QosProfile {
            resource_limits: ResourceLimits {
                max_samples: 10,
                max_instances: 5,
                max_samples_per_instance: 10,
                max_quota_bytes: 10_000_000,
            },
            ..Default::default()
        };
        let result = qos.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("max_samples"));
    }

    #[test]
    fn test_durability_ordering_implements_rxo() {
        assert!(Durability::Persistent > Durability::Transient);
        assert!(Durability::Transient > Durability::TransientLocal);
        assert!(Durability::TransientLocal > Durability::Volatile);
    }

    #[test]
    fn test_compatible_profiles_report_no_incompatibilities() {
        let offered = QosProfile::default();
        let requested = QosProfile::default();
        assert!(offered.is_compatible_with(&requested).is_empty());
    }

    #[test]
    fn test_reliability_mismatch_is_reported() {
        let offered = QosProfile { reliability: Reliability::best_effort(), ..Default::default() };
        let requested =
            QosProfile { reliability: Reliability::reliable(Duration::from_millis(100)), ..Default::default() };
        assert_eq!(offered.is_compatible_with(&requested), vec![Incompatibility::Reliability]);
    }

    #[test]
    fn test_reliability_compatibility_ignores_max_blocking_time() {
        let offered =
            QosProfile { reliability: Reliability::reliable(Duration::from_millis(10)), ..Default::default() };
        let requested =
            QosProfile { reliability: Reliability::reliable(Duration::from_secs(5)), ..Default::default() };
        assert!(offered.is_compatible_with(&requested).is_empty());
    }

    #[test]
    fn test_writer_binding_defaults_to_stateful() {
        assert_eq!(QosProfile::default().writer_binding, WriterBinding::Stateful);
    }

    #[test]
    fn test_partition_mismatch_is_reported() {
        let offered =
            QosProfile { partition: Partition::single("sensor"), ..Default::default() };
        let requested =
            QosProfile { partition: Partition::single("actuator"), ..Default::default() };
        assert_eq!(offered.is_compatible_with(&requested), vec![Incompatibility::Partition]);
    }

    #[test]
    fn test_qos_low_latency() {
        let qos = QosProfile::low_latency();
        assert_eq!(qos.history, History::KeepLast(1));
        assert!(qos.validate().is_ok());
    }

    #[test]
    fn test_qos_high_throughput() {
        let qos = QosProfile::high_throughput();
        assert_eq!(qos.history, History::KeepLast(1000));
        assert!(qos.validate().is_ok());
    }
}
