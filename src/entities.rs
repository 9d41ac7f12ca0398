// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DCPS-facing handles: [`Participant`], [`DataWriter`], [`DataReader`].
//!
//! This module is the seam where discovery match events become writer/reader
//! proxies, QoS becomes a concrete [`WriterKind`]/[`ReaderKind`] choice, and
//! the history cache is driven by the application's `write`/`take` calls. It
//! owns no wire I/O itself — callers drain `send_now`/`poll_acknack` and feed
//! received submessages in, the same shape [`crate::writer`]/[`crate::reader`]
//! already expose.

use crate::cache::{Change, ChangeKind, HistoryCache};
use crate::discovery::{Discovery, MatchEvent, SedpData, SpdpData};
use crate::error::{Error, Result};
use crate::qos::QosProfile;
use crate::reader::ReaderKind;
use crate::security::{AllowAll, SecurityHooks};
use crate::types::{EntityId, Guid, InstanceHandle, Locator, SequenceNumber};
use crate::typesupport::TypeSupport;
use dashmap::DashSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Build a non-builtin writer `EntityId` from a per-participant counter
/// (entity-kind byte `0x02`, matching [`crate::types::EntityKind::Writer`]).
fn user_writer_entity_id(n: u32) -> EntityId {
    let b = n.to_be_bytes();
    EntityId([b[1], b[2], b[3], 0x02])
}

/// Build a non-builtin reader `EntityId` from a per-participant counter
/// (entity-kind byte `0x07`, matching [`crate::types::EntityKind::Reader`]).
fn user_reader_entity_id(n: u32) -> EntityId {
    let b = n.to_be_bytes();
    EntityId([b[1], b[2], b[3], 0x07])
}

fn writer_kind_for(qos: &QosProfile, writer_id: EntityId) -> crate::writer::WriterKind {
    use crate::qos::{ReliabilityKind, WriterBinding};
    use crate::writer::WriterKind;
    match (qos.writer_binding, qos.reliability.kind) {
        (WriterBinding::Stateless, ReliabilityKind::BestEffort) => WriterKind::stateless_best_effort(),
        (WriterBinding::Stateless, ReliabilityKind::Reliable) => WriterKind::stateless_reliable(
            Duration::from_millis(crate::config::STATELESS_RESEND_PERIOD_MS),
            crate::config::STATELESS_MAX_RETRIES,
        ),
        (WriterBinding::Stateful, ReliabilityKind::BestEffort) => WriterKind::stateful_best_effort(),
        (WriterBinding::Stateful, ReliabilityKind::Reliable) => WriterKind::stateful_reliable(
            writer_id,
            Duration::from_millis(crate::config::HEARTBEAT_PERIOD_MS),
        ),
    }
}

fn reader_kind_for(qos: &QosProfile, reader_id: EntityId) -> ReaderKind {
    use crate::qos::ReliabilityKind;
    match qos.reliability.kind {
        ReliabilityKind::BestEffort => ReaderKind::best_effort(),
        ReliabilityKind::Reliable => ReaderKind::reliable(reader_id),
    }
}

/// A local publication: owns the writer state machine, the writer-side
/// history cache, and the type support used to marshal outgoing samples.
pub struct DataWriter {
    pub guid: Guid,
    pub topic_name: String,
    pub qos: QosProfile,
    type_support: Arc<dyn TypeSupport>,
    kind: Mutex<crate::writer::WriterKind>,
    cache: HistoryCache,
    next_seq: AtomicU64,
    matched_readers: DashSet<Guid>,
}

impl DataWriter {
    #[must_use]
    pub fn new(guid: Guid, topic_name: impl Into<String>, qos: QosProfile, type_support: Arc<dyn TypeSupport>) -> Self {
        let cache = HistoryCache::new(qos.resource_limits, qos.history)
            .with_time_based_filter(qos.time_based_filter)
            .with_max_blocking_time(qos.reliability.max_blocking_time);
        Self {
            kind: Mutex::new(writer_kind_for(&qos, guid.entity_id)),
            guid,
            topic_name: topic_name.into(),
            qos,
            type_support,
            cache,
            next_seq: AtomicU64::new(1),
            matched_readers: DashSet::new(),
        }
    }

    /// Marshal and insert `sample` into the writer's history cache, queuing
    /// it for every matched reader. Returns the sequence number assigned.
    pub fn write(&self, instance: InstanceHandle, sample: &[u8]) -> Result<SequenceNumber> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) as SequenceNumber;
        let size = self.type_support.marshalled_size(sample);
        let mut data = vec![0u8; size];
        self.type_support.marshall(&mut data, sample, false)?;
        let change = Change::new(ChangeKind::Alive, self.guid, seq, instance, SystemTime::now(), data.into());
        let change =
            self.cache.add_inst(change, self.qos.reliability.kind == crate::qos::ReliabilityKind::Reliable)?;

        let kind = self.kind.lock();
        match &*kind {
            crate::writer::WriterKind::StatelessBestEffort(w) => w.new_change(change),
            crate::writer::WriterKind::StatelessReliable(w) => w.new_change(change),
            crate::writer::WriterKind::StatefulBestEffort(w) => {
                for reader in &self.matched_readers {
                    w.new_change(*reader, seq);
                }
            }
            crate::writer::WriterKind::StatefulReliable(w) => {
                for reader in &self.matched_readers {
                    w.new_change(*reader, seq);
                }
            }
        }
        Ok(seq)
    }

    /// Build a proxy for a newly matched reader (stateful arms) or widen the
    /// destination locator set (stateless arms, which track destinations
    /// rather than per-reader proxies — the full set is recomputed here).
    pub fn matched_reader_add(&self, reader: Guid, locators: Vec<Locator>, lease_duration: Duration) {
        self.matched_readers.insert(reader);
        let kind = self.kind.lock();
        match &*kind {
            crate::writer::WriterKind::StatelessBestEffort(w) => w.start(locators),
            crate::writer::WriterKind::StatelessReliable(w) => w.start(locators),
            crate::writer::WriterKind::StatefulBestEffort(w) => w.start(reader, lease_duration),
            crate::writer::WriterKind::StatefulReliable(w) => w.start(reader, lease_duration),
        }
    }

    pub fn matched_reader_remove(&self, reader: Guid) {
        self.matched_readers.remove(&reader);
        let kind = self.kind.lock();
        match &*kind {
            crate::writer::WriterKind::StatelessBestEffort(w) => w.finish(),
            crate::writer::WriterKind::StatelessReliable(w) => w.finish(),
            crate::writer::WriterKind::StatefulBestEffort(w) => w.finish(reader),
            crate::writer::WriterKind::StatefulReliable(w) => w.finish(reader),
        }
    }

    #[must_use]
    pub fn history_cache(&self) -> &HistoryCache {
        &self.cache
    }
}

/// A local subscription: owns the reader state machine, the reader-side
/// history cache, and the type support used to unmarshal incoming samples.
pub struct DataReader {
    pub guid: Guid,
    pub topic_name: String,
    pub qos: QosProfile,
    type_support: Arc<dyn TypeSupport>,
    kind: Mutex<ReaderKind>,
    cache: HistoryCache,
}

impl DataReader {
    #[must_use]
    pub fn new(guid: Guid, topic_name: impl Into<String>, qos: QosProfile, type_support: Arc<dyn TypeSupport>) -> Self {
        let cache = HistoryCache::new(qos.resource_limits, qos.history)
            .with_time_based_filter(qos.time_based_filter)
            .with_max_blocking_time(qos.reliability.max_blocking_time);
        Self {
            kind: Mutex::new(reader_kind_for(&qos, guid.entity_id)),
            guid,
            topic_name: topic_name.into(),
            qos,
            type_support,
            cache,
        }
    }

    /// Unmarshal `data`, returning the decoded sample bytes ready for the
    /// application. The history-cache insertion (duplicate/ordering
    /// handling) is driven separately by [`ReaderKind`] via the writer's
    /// GUID — this is purely the type-support round trip.
    pub fn unmarshall(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.type_support.unmarshall(data, false)
    }

    pub fn matched_writer_add(&self, writer: Guid) {
        let kind = self.kind.lock();
        match &*kind {
            ReaderKind::BestEffort(r) => r.start(writer),
            ReaderKind::Reliable(r) => r.start(writer),
        }
    }

    pub fn matched_writer_remove(&self, writer: Guid) {
        let kind = self.kind.lock();
        match &*kind {
            ReaderKind::BestEffort(r) => r.finish(writer),
            ReaderKind::Reliable(r) => r.finish(writer),
        }
    }

    #[must_use]
    pub fn history_cache(&self) -> &HistoryCache {
        &self.cache
    }
}

/// A per-domain participant: owns discovery state and the set of local
/// writers/readers, and turns SEDP match events into proxy construction.
pub struct Participant {
    pub guid: Guid,
    pub domain_id: u32,
    discovery: Discovery,
    writers: Mutex<Vec<Arc<DataWriter>>>,
    readers: Mutex<Vec<Arc<DataReader>>>,
    security: Arc<dyn SecurityHooks>,
}

impl Participant {
    #[must_use]
    pub fn new(guid: Guid, domain_id: u32) -> Self {
        Self {
            guid,
            domain_id,
            discovery: Discovery::new(),
            writers: Mutex::new(Vec::new()),
            readers: Mutex::new(Vec::new()),
            security: Arc::new(AllowAll),
        }
    }

    #[must_use]
    pub fn with_security(mut self, hooks: Arc<dyn SecurityHooks>) -> Self {
        self.security = hooks;
        self
    }

    pub fn create_writer(&self, topic_name: &str, qos: QosProfile, type_support: Arc<dyn TypeSupport>) -> Result<Arc<DataWriter>> {
        self.security.check_create_writer(topic_name, &qos).map_err(|e| {
            log::warn!("[Entities] create_writer('{topic_name}') denied: {e}");
            Error::AccessDenied(e)
        })?;
        let entity_id = user_writer_entity_id(self.writers.lock().len() as u32 + 1);
        let guid = Guid::new(self.guid.prefix, entity_id);
        log::debug!("[Entities] created writer {guid} for topic '{topic_name}'");
        let writer = Arc::new(DataWriter::new(guid, topic_name, qos, type_support));
        self.writers.lock().push(writer.clone());
        Ok(writer)
    }

    pub fn create_reader(&self, topic_name: &str, qos: QosProfile, type_support: Arc<dyn TypeSupport>) -> Result<Arc<DataReader>> {
        self.security.check_create_reader(topic_name, &qos).map_err(|e| {
            log::warn!("[Entities] create_reader('{topic_name}') denied: {e}");
            Error::AccessDenied(e)
        })?;
        let entity_id = user_reader_entity_id(self.readers.lock().len() as u32 + 1);
        let guid = Guid::new(self.guid.prefix, entity_id);
        log::debug!("[Entities] created reader {guid} for topic '{topic_name}'");
        let reader = Arc::new(DataReader::new(guid, topic_name, qos, type_support));
        self.readers.lock().push(reader.clone());
        Ok(reader)
    }

    pub fn on_spdp(&self, data: SpdpData) -> bool {
        self.discovery.on_spdp(data)
    }

    pub fn expire_participants(&self) -> Vec<Guid> {
        self.discovery.expire_participants()
    }

    /// Process a SEDP announcement, rejecting it via the security hooks
    /// before it reaches the matcher, then wire each resulting match/unmatch
    /// event into the corresponding local endpoint's proxy registry.
    pub fn on_sedp(&self, data: SedpData) -> Result<Vec<MatchEvent>> {
        if data.is_writer {
            self.security.check_peer_writer(data.participant_guid, &data.topic_name).map_err(Error::AccessDenied)?;
        } else {
            self.security.check_peer_reader(data.participant_guid, &data.topic_name).map_err(Error::AccessDenied)?;
        }
        let locators = data.unicast_locators.clone();
        let events = self.discovery.on_sedp(data);
        for event in &events {
            self.apply_match_event(event, &locators);
        }
        Ok(events)
    }

    pub fn remove_endpoint(&self, guid: Guid) -> Vec<MatchEvent> {
        let events = self.discovery.remove_endpoint(guid);
        for event in &events {
            self.apply_match_event(event, &[]);
        }
        events
    }

    fn apply_match_event(&self, event: &MatchEvent, locators: &[Locator]) {
        match *event {
            MatchEvent::Matched { writer, reader } => {
                if let Some(w) = self.local_writer(writer) {
                    w.matched_reader_add(reader, locators.to_vec(), Duration::from_millis(crate::config::PARTICIPANT_LEASE_DURATION_MS));
                }
                if let Some(r) = self.local_reader(reader) {
                    r.matched_writer_add(writer);
                }
            }
            MatchEvent::Unmatched { writer, reader } => {
                if let Some(w) = self.local_writer(writer) {
                    w.matched_reader_remove(reader);
                }
                if let Some(r) = self.local_reader(reader) {
                    r.matched_writer_remove(writer);
                }
            }
        }
    }

    fn local_writer(&self, guid: Guid) -> Option<Arc<DataWriter>> {
        self.writers.lock().iter().find(|w| w.guid == guid).cloned()
    }

    fn local_reader(&self, guid: Guid) -> Option<Arc<DataReader>> {
        self.readers.lock().iter().find(|r| r.guid == guid).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::{Reliability, WriterBinding};
    use crate::typesupport::{FieldLayout, FieldType, PrimitiveKind, TypeDescriptor};

    fn type_support() -> Arc<dyn TypeSupport> {
        Arc::new(TypeDescriptor::new(
            "Point",
            8,
            vec![
                FieldLayout { name: "x", offset_bytes: 0, field_type: FieldType::Primitive(PrimitiveKind::I32), size_bytes: 4, is_key: true },
                FieldLayout { name: "y", offset_bytes: 4, field_type: FieldType::Primitive(PrimitiveKind::I32), size_bytes: 4, is_key: false },
            ],
        ))
    }

    fn guid(id: u8) -> Guid {
        let mut g = Guid::unknown();
        g.prefix[0] = id;
        g
    }

    #[test]
    fn write_assigns_increasing_sequence_numbers() {
        let w = DataWriter::new(guid(1), "topic.A", QosProfile::default(), type_support());
        let s1 = w.write([0; 16], &[1, 0, 0, 0, 2, 0, 0, 0]).unwrap();
        let s2 = w.write([0; 16], &[1, 0, 0, 0, 3, 0, 0, 0]).unwrap();
        assert_eq!(s1, 1);
        assert_eq!(s2, 2);
    }

    #[test]
    fn matching_writer_and_reader_wires_proxies() {
        let participant = Participant::new(guid(1), 0);
        let mut qos = QosProfile::default();
        qos.reliability = Reliability::reliable(Duration::from_millis(100));
        let writer = participant.create_writer("topic.A", qos.clone(), type_support()).unwrap();
        let reader = participant.create_reader("topic.A", qos, type_support()).unwrap();

        participant
            .on_sedp(SedpData {
                endpoint_guid: writer.guid,
                participant_guid: guid(1),
                topic_name: "topic.A".into(),
                type_name: "Point".into(),
                qos: writer.qos.clone(),
                unicast_locators: Vec::new(),
                is_writer: true,
            })
            .unwrap();
        let events = participant
            .on_sedp(SedpData {
                endpoint_guid: reader.guid,
                participant_guid: guid(1),
                topic_name: "topic.A".into(),
                type_name: "Point".into(),
                qos: reader.qos.clone(),
                unicast_locators: Vec::new(),
                is_writer: false,
            })
            .unwrap();

        assert_eq!(events, vec![MatchEvent::Matched { writer: writer.guid, reader: reader.guid }]);
        if let crate::writer::WriterKind::StatefulReliable(w) = &*writer_kind(&writer) {
            assert_eq!(w.matched_count(), 1);
        } else {
            panic!("expected stateful reliable writer");
        }
    }

    fn writer_kind(w: &DataWriter) -> parking_lot::MutexGuard<'_, crate::writer::WriterKind> {
        w.kind.lock()
    }

    #[test]
    fn stateless_writer_binding_is_reachable_from_writer_creation() {
        let participant = Participant::new(guid(1), 0);
        let qos = QosProfile { writer_binding: WriterBinding::Stateless, ..QosProfile::default() };
        let writer = participant.create_writer("topic.spdp", qos, type_support()).unwrap();
        assert!(matches!(&*writer_kind(&writer), crate::writer::WriterKind::StatelessBestEffort(_)));
    }

    #[test]
    fn stateless_reliable_writer_binding_is_reachable_from_writer_creation() {
        let participant = Participant::new(guid(1), 0);
        let qos = QosProfile {
            writer_binding: WriterBinding::Stateless,
            reliability: Reliability::reliable(Duration::from_millis(100)),
            ..QosProfile::default()
        };
        let writer = participant.create_writer("topic.spdp", qos, type_support()).unwrap();
        assert!(matches!(&*writer_kind(&writer), crate::writer::WriterKind::StatelessReliable(_)));
    }
}
