// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rtps-engine
//!
//! A protocol engine for the OMG RTPS (Real-Time Publish-Subscribe) wire
//! protocol underlying DDS middleware: discovery (SPDP/SEDP), reliability
//! (stateful/stateless writer and reader state machines), the history
//! cache, and the transport/guard/timer machinery those depend on.
//!
//! This crate stops at the wire protocol and entity layer — it does not
//! implement the full DCPS API surface (no `WaitSet`, no `ContentFilteredTopic`,
//! no code-generated type support). [`Participant`]/[`DataWriter`]/[`DataReader`]
//! in [`entities`] are the thinnest DCPS-facing seam that exercises the
//! engine underneath; a full middleware would layer `Publisher`/`Subscriber`
//! and typed bindings on top of it.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |               entities: Participant / DataWriter / DataReader       |
//! +---------------------------------------------------------------------+
//! |   discovery (SPDP/SEDP, Matcher)   |   qos (QosProfile, RxO rules)  |
//! +---------------------------------------------------------------------+
//! |   writer::WriterKind   |   reader::ReaderKind   |   cache (History) |
//! |   (stateful/stateless, match-dispatched, no per-proxy heap alloc)   |
//! +---------------------------------------------------------------------+
//! |   proxy (RemoteReaderProxy / RemoteWriterProxy)  |  message (codec) |
//! +---------------------------------------------------------------------+
//! |   transport (UdpTransport, PortMapping)  |  guard / timer / pool    |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`entities::Participant`] | Entry point: owns discovery state, creates writers/readers |
//! | [`entities::DataWriter`] | Publishes marshalled samples, drives a [`writer::WriterKind`] |
//! | [`entities::DataReader`] | Unmarshals incoming samples, drives a [`reader::ReaderKind`] |
//! | [`qos::QosProfile`] | Reliability/History/Durability/... QoS policies |
//! | [`transport::Transport`] | Send/receive boundary; [`transport::UdpTransport`] is the reference backend |
//! | [`security::SecurityHooks`] | Authentication/access-control decision points |

/// History cache: per-endpoint ordered store of samples, shared by writer-
/// and reader-side endpoints.
pub mod cache;
/// Layered engine configuration: Level-1 RTPS constants, Level-2 runtime overrides.
pub mod config;
/// SPDP/SEDP discovery: participant leases, endpoint registry, topic/type/QoS matcher.
pub mod discovery;
/// DCPS-facing handles (`Participant`/`DataWriter`/`DataReader`) tying the engine together.
pub mod entities;
/// Crate-wide error type.
pub mod error;
/// Guard subsystem: timer-driven liveliness, deadline, lifespan, autopurge checks.
pub mod guard;
/// Interned, refcounted locator nodes shared across proxies, endpoints, and participants.
pub mod locator_registry;
/// RTPS wire protocol: message header, submessage codecs, parser/builder.
pub mod message;
/// Lock-free slab allocator backing outgoing message buffers.
pub mod pool;
/// Proxy model: per-association protocol state for one matched writer/reader pair.
pub mod proxy;
/// QoS (Quality of Service) policies for `DataWriter`/`DataReader`.
pub mod qos;
/// RTPS Reader state machines (`BestEffortReader`/`ReliableReader`).
pub mod reader;
/// Pass-through security hooks (DDS Security authentication/access-control seam).
pub mod security;
/// Absolute-time timer wheel driving guards and reliability timers.
pub mod timer;
/// Transport abstraction and the UDP reference backend.
pub mod transport;
/// Opaque type-support trait the engine uses to marshal/unmarshal samples.
pub mod typesupport;
/// Core wire-level value types: GUIDs, locators, sequence numbers.
pub mod types;
/// RTPS Writer state machines (`Stateless`/`Stateful` x `BestEffort`/`Reliable`).
pub mod writer;

pub use cache::{Change, ChangeKind, HistoryCache, StateMask};
pub use discovery::{Discovery, MatchEvent, SedpData, SpdpData};
pub use entities::{DataReader, DataWriter, Participant};
pub use error::{Error, Result};
pub use qos::QosProfile;
pub use security::{AllowAll, SecurityHooks};
pub use transport::{CustomPortMapping, PortMapping, Transport, UdpTransport};
pub use types::{EntityId, Guid, GuidPrefix, Locator};

/// Crate version string, matching `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_surface_constructs_a_participant_and_entities() {
        use crate::typesupport::{FieldLayout, FieldType, PrimitiveKind, TypeDescriptor};
        use std::sync::Arc;

        let participant = Participant::new(Guid::unknown(), 0);
        let type_support: Arc<dyn crate::typesupport::TypeSupport> = Arc::new(TypeDescriptor::new(
            "Point",
            8,
            vec![
                FieldLayout { name: "x", offset_bytes: 0, field_type: FieldType::Primitive(PrimitiveKind::I32), size_bytes: 4, is_key: true },
                FieldLayout { name: "y", offset_bytes: 4, field_type: FieldType::Primitive(PrimitiveKind::I32), size_bytes: 4, is_key: false },
            ],
        ));
        let writer = participant.create_writer("topic.A", QosProfile::default(), type_support.clone()).unwrap();
        let reader = participant.create_reader("topic.A", QosProfile::default(), type_support).unwrap();
        assert_ne!(writer.guid, reader.guid);
    }

    #[test]
    fn version_is_non_empty() {
        assert!(!VERSION.is_empty());
    }
}
