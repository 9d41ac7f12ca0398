// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SPDP/SEDP discovery: participant leases, endpoint announcements, and the
//! topic/type/QoS matcher that turns them into match/unmatch events.

pub mod matcher;
pub mod participant;
pub mod sedp;

pub use matcher::Matcher;
pub use participant::{ParticipantRegistry, SpdpData};
pub use sedp::{EndpointRegistry, SedpData};

use crate::types::Guid;
use dashmap::DashSet;

/// A writer/reader pair transitioning into or out of a match, reported by
/// [`Discovery::on_sedp`] and [`Discovery::remove_endpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    Matched { writer: Guid, reader: Guid },
    Unmatched { writer: Guid, reader: Guid },
}

/// Facade tying participant and endpoint discovery together with the match
/// table that tracks which writer/reader pairs are currently matched.
#[derive(Default)]
pub struct Discovery {
    participants: ParticipantRegistry,
    endpoints: EndpointRegistry,
    matches: DashSet<(Guid, Guid)>,
}

impl Discovery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an SPDP announcement; see [`ParticipantRegistry::on_spdp`].
    pub fn on_spdp(&self, data: SpdpData) -> bool {
        self.participants.on_spdp(data)
    }

    /// Sweep participants past their lease grace; see [`ParticipantRegistry::expire`].
    pub fn expire_participants(&self) -> Vec<Guid> {
        self.participants.expire()
    }

    /// Process a SEDP announcement for one endpoint, re-matching it against
    /// every opposite-direction endpoint on the same topic. An endpoint
    /// re-announced under an unchanged participant and QoS re-evaluates to
    /// the same compatibility verdict, so no redundant event is emitted; an
    /// endpoint that moved participants (rare) is still re-announced under
    /// the same GUID here — the caller is expected to treat a GUID whose
    /// `participant_guid` changed as remove-then-add by calling
    /// [`Discovery::remove_endpoint`] first.
    pub fn on_sedp(&self, data: SedpData) -> Vec<MatchEvent> {
        let is_writer = data.is_writer;
        let topic = data.topic_name.clone();
        self.endpoints.announce(data.clone());

        let peers =
            if is_writer { self.endpoints.readers_for_topic(&topic) } else { self.endpoints.writers_for_topic(&topic) };

        let mut events = Vec::new();
        for peer in peers {
            let (writer, reader) = if is_writer { (&data, &peer) } else { (&peer, &data) };
            let pair = (writer.endpoint_guid, reader.endpoint_guid);
            let compatible = Matcher::is_match(writer, reader);
            let already_matched = self.matches.contains(&pair);
            if compatible && !already_matched {
                self.matches.insert(pair);
                log::info!("[Discovery] matched writer {} with reader {} on topic '{topic}'", pair.0, pair.1);
                events.push(MatchEvent::Matched { writer: pair.0, reader: pair.1 });
            } else if !compatible && already_matched {
                self.matches.remove(&pair);
                log::debug!("[Discovery] unmatched writer {} from reader {} on topic '{topic}'", pair.0, pair.1);
                events.push(MatchEvent::Unmatched { writer: pair.0, reader: pair.1 });
            }
        }
        events
    }

    /// Remove a discovered endpoint, tearing down every match it was part
    /// of and reporting one [`MatchEvent::Unmatched`] per pair.
    pub fn remove_endpoint(&self, guid: Guid) -> Vec<MatchEvent> {
        self.endpoints.remove(&guid);

        let stale: Vec<(Guid, Guid)> = self.matches.iter().map(|p| *p).filter(|p| p.0 == guid || p.1 == guid).collect();
        let mut events = Vec::with_capacity(stale.len());
        for pair in stale {
            self.matches.remove(&pair);
            events.push(MatchEvent::Unmatched { writer: pair.0, reader: pair.1 });
        }
        events
    }

    #[must_use]
    pub fn is_matched(&self, writer: Guid, reader: Guid) -> bool {
        self.matches.contains(&(writer, reader))
    }
}
