// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic/type/QoS compatibility checks run on every SEDP announcement.

use super::sedp::SedpData;
use crate::qos::Incompatibility;

pub struct Matcher;

impl Matcher {
    /// Exact topic-name match; RTPS defines no wildcarding here.
    #[must_use]
    pub fn is_topic_match(writer_topic: &str, reader_topic: &str) -> bool {
        writer_topic == reader_topic
    }

    /// Exact type-name match, mirroring [`crate::typesupport::type_equal`]'s
    /// by-name comparison at the SEDP layer (before a local `TypeSupport`
    /// handle is even resolved).
    #[must_use]
    pub fn is_type_match(writer_type: &str, reader_type: &str) -> bool {
        writer_type == reader_type
    }

    /// RxO QoS incompatibilities between offered (writer) and requested
    /// (reader) policies, delegating to [`crate::qos::QosProfile::is_compatible_with`].
    #[must_use]
    pub fn qos_incompatibilities(writer: &SedpData, reader: &SedpData) -> Vec<Incompatibility> {
        writer.qos.is_compatible_with(&reader.qos)
    }

    /// True when a writer and reader should be matched: same topic, same
    /// type, and no QoS incompatibility.
    #[must_use]
    pub fn is_match(writer: &SedpData, reader: &SedpData) -> bool {
        Self::is_topic_match(&writer.topic_name, &reader.topic_name)
            && Self::is_type_match(&writer.type_name, &reader.type_name)
            && Self::qos_incompatibilities(writer, reader).is_empty()
    }
}
