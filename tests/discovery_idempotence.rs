// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Republishing an identical SEDP record does not create duplicate proxies
//! or spurious match events.

use rtps_engine::discovery::{Discovery, MatchEvent, SedpData};
use rtps_engine::qos::QosProfile;
use rtps_engine::types::Guid;

fn guid(id: u8) -> Guid {
    let mut g = Guid::unknown();
    g.prefix[0] = id;
    g
}

fn endpoint(ep: Guid, participant: Guid, is_writer: bool) -> SedpData {
    SedpData {
        endpoint_guid: ep,
        participant_guid: participant,
        topic_name: "fixture.topic".into(),
        type_name: "FixtureType".into(),
        qos: QosProfile::default(),
        unicast_locators: Vec::new(),
        is_writer,
    }
}

#[test]
fn republishing_an_unchanged_endpoint_emits_no_further_events() {
    let discovery = Discovery::new();
    let writer = guid(1);
    let reader = guid(2);

    let first = discovery.on_sedp(endpoint(writer, guid(10), true));
    assert!(first.is_empty());
    let matched = discovery.on_sedp(endpoint(reader, guid(11), false));
    assert_eq!(matched, vec![MatchEvent::Matched { writer, reader }]);

    for _ in 0..5 {
        let events = discovery.on_sedp(endpoint(writer, guid(10), true));
        assert!(events.is_empty(), "re-announcing the same writer record must not re-match or duplicate");
        assert!(discovery.is_matched(writer, reader), "the original match must survive every re-announcement");
    }
}

#[test]
fn republishing_with_changed_qos_only_re_evaluates_compatibility() {
    use rtps_engine::qos::Reliability;
    use std::time::Duration;

    let discovery = Discovery::new();
    let writer = guid(1);
    let reader = guid(2);

    let mut reliable_writer = endpoint(writer, guid(10), true);
    reliable_writer.qos.reliability = Reliability::reliable(Duration::from_millis(100));
    discovery.on_sedp(reliable_writer.clone());

    let mut reliable_reader = endpoint(reader, guid(11), false);
    reliable_reader.qos.reliability = Reliability::reliable(Duration::from_millis(100));
    let matched = discovery.on_sedp(reliable_reader);
    assert_eq!(matched, vec![MatchEvent::Matched { writer, reader }]);

    // The writer downgrades to best-effort: now incompatible with the
    // reader's reliable request, so the pair must unmatch.
    let mut best_effort_writer = reliable_writer;
    best_effort_writer.qos.reliability = Reliability::best_effort();
    let events = discovery.on_sedp(best_effort_writer);
    assert_eq!(events, vec![MatchEvent::Unmatched { writer, reader }]);
    assert!(!discovery.is_matched(writer, reader));
}
