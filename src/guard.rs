// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Guard subsystem: timer-driven liveliness, deadline, lifespan, and
//! autopurge checks.
//!
//! Grounded on the original implementation's five check families
//! (`tinq-core/dds/src/include/guard.h`): liveliness, deadline, lifespan,
//! autopurge-no-writers, autopurge-disposed. The original keeps one
//! statically-sized timer per participant/endpoint and threads them
//! together by hand; here each [`GuardChain`] owns a [`crate::timer::TimerWheel`]
//! and the "one timer per chain" invariant is enforced by construction
//! (the chain only ever has one wheel).
//!
//! `*_used(qp)` in the original is a macro checking the relevant duration
//! isn't `DDS_DURATION_INFINITE`; that becomes [`GuardSpec::is_active`] here.

use crate::timer::{Recurrence, TimerId, TimerWheel};
use std::time::{Duration, Instant};

/// Which check family a guard implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    Liveliness,
    Deadline,
    Lifespan,
    AutopurgeNoWriters,
    AutopurgeDisposed,
}

/// Firing cadence for a guard, matching SPEC_FULL.md §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    /// Never fires (guard is disabled / period is infinite).
    None,
    /// Fires exactly once then must be re-armed explicitly.
    OneShot,
    /// Fires every `period`.
    Periodic,
    /// A sorted sequence of independent one-shot deadlines, each firing once
    /// as its absolute time passes (used for per-instance lifespan/autopurge
    /// expiry, where every sample has its own deadline).
    Progressive,
    /// Manual-by-participant liveliness: fires proactively at 7/8 of the
    /// lease period to allow a renewal before the full timeout, then again
    /// at the full period if no renewal occurred.
    Mixed,
}

/// Configuration for one guard.
#[derive(Debug, Clone, Copy)]
pub struct GuardSpec {
    pub kind: GuardKind,
    pub period: Duration,
}

impl GuardSpec {
    /// Mirrors `{liveliness,deadline,lifespan,autopurge_*}_used(qp)`: a
    /// guard with an effectively-infinite period is inert.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.period < Duration::from_secs(u64::MAX / 2)
    }

    #[must_use]
    pub fn mode(&self) -> GuardMode {
        if !self.is_active() {
            GuardMode::None
        } else {
            match self.kind {
                GuardKind::Liveliness => GuardMode::Mixed,
                GuardKind::Lifespan | GuardKind::AutopurgeDisposed | GuardKind::AutopurgeNoWriters => {
                    GuardMode::Progressive
                }
                GuardKind::Deadline => GuardMode::Periodic,
            }
        }
    }
}

/// Outcome of a guard firing, returned to the caller driving the chain so it
/// can invoke the matching DCPS listener / cache action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardEvent {
    LivelinessLost,
    LivelinessProactiveRenew,
    DeadlineMissed,
    LifespanExpired,
    AutopurgeNoWriters,
    AutopurgeDisposed,
}

struct Armed {
    kind: GuardKind,
    spec: GuardSpec,
}

/// A chain of guards sharing a single timer. At most one [`TimerWheel`]
/// entry is ever outstanding per guard slot (enforced by re-scheduling on
/// every `restart`/`continue_`), matching the "exactly one active timer per
/// chain" invariant in SPEC_FULL.md §3/§4.7.
pub struct GuardChain {
    wheel: TimerWheel<GuardKind>,
    armed: Vec<(TimerId, Armed)>,
    last_observed: Instant,
}

impl Default for GuardChain {
    fn default() -> Self {
        Self { wheel: TimerWheel::new(), armed: Vec::new(), last_observed: Instant::now() }
    }
}

impl GuardChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `{liveliness,deadline,lifespan,autopurge_*}_enable`: arm a guard on
    /// this chain if its spec is active.
    pub fn enable(&mut self, spec: GuardSpec) {
        if !spec.is_active() {
            return;
        }
        let recurrence = match spec.mode() {
            GuardMode::Periodic => Recurrence::Every(spec.period),
            GuardMode::Mixed => Recurrence::Once, // proactive renew is a one-shot, rearmed explicitly
            _ => Recurrence::Once,
        };
        let deadline = match spec.mode() {
            GuardMode::Mixed => Instant::now() + spec.period.mul_f64(0.875),
            _ => Instant::now() + spec.period,
        };
        let id = self.wheel.schedule(deadline, recurrence, spec.kind);
        self.armed.push((id, Armed { kind: spec.kind, spec }));
        self.last_observed = Instant::now();
    }

    /// `{liveliness,deadline,lifespan,autopurge_*}_disable`.
    pub fn disable(&mut self, kind: GuardKind) {
        self.armed.retain(|(id, armed)| {
            if armed.kind == kind {
                self.wheel.cancel(*id);
                false
            } else {
                true
            }
        });
    }

    /// `{deadline,lifespan,autopurge_*}_continue`: the guarded condition was
    /// restored (data written, lease renewed); reset this guard's timer to
    /// the head of the chain.
    pub fn restart(&mut self, kind: GuardKind) {
        if let Some(pos) = self.armed.iter().position(|(_, a)| a.kind == kind) {
            let (old_id, armed) = self.armed.remove(pos);
            self.wheel.cancel(old_id);
            self.enable(armed.spec);
        }
        self.last_observed = Instant::now();
    }

    /// Drive the chain: pop every expired timer as of `now` and translate it
    /// into the event the caller should act on. Mixed-mode guards that fire
    /// their proactive-renew deadline without an intervening `restart` are
    /// re-armed for the full period and reported as `LivelinessLost` only
    /// once the full period (not the 7/8 mark) has actually elapsed.
    pub fn poll(&mut self, now: Instant) -> Vec<GuardEvent> {
        let fired = self.wheel.poll_expired(now);
        let mut events = Vec::with_capacity(fired.len());
        for kind in fired {
            let Some(armed_idx) = self.armed.iter().position(|(_, a)| a.kind == kind) else {
                continue;
            };
            let spec = self.armed[armed_idx].1.spec;
            match spec.mode() {
                GuardMode::Mixed => {
                    let full_deadline_passed = now.duration_since(self.last_observed) >= spec.period;
                    if full_deadline_passed {
                        events.push(GuardEvent::LivelinessLost);
                    } else {
                        events.push(GuardEvent::LivelinessProactiveRenew);
                        // Re-arm for the remainder of the full period.
                        let id = self.wheel.schedule(
                            self.last_observed + spec.period,
                            Recurrence::Once,
                            kind,
                        );
                        self.armed[armed_idx].0 = id;
                    }
                }
                GuardMode::Periodic => events.push(match kind {
                    GuardKind::Deadline => GuardEvent::DeadlineMissed,
                    _ => unreachable!("only deadline guards are periodic"),
                }),
                GuardMode::Progressive => events.push(match kind {
                    GuardKind::Lifespan => GuardEvent::LifespanExpired,
                    GuardKind::AutopurgeNoWriters => GuardEvent::AutopurgeNoWriters,
                    GuardKind::AutopurgeDisposed => GuardEvent::AutopurgeDisposed,
                    _ => unreachable!("only lifespan/autopurge guards are progressive"),
                }),
                GuardMode::OneShot | GuardMode::None => {}
            }
        }
        events
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.wheel.next_deadline()
    }
}
