// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deadline and lifespan guard scenarios, driven through [`GuardChain`] the
//! way a writer/reader's periodic housekeeping would.

use rtps_engine::guard::{GuardChain, GuardEvent, GuardKind, GuardSpec};
use std::time::{Duration, Instant};

/// A reader expects data every 200ms; the writer stops after its last write.
/// Within 400ms of that write, the deadline guard must report exactly one
/// miss.
#[test]
fn deadline_miss_is_reported_within_two_periods() {
    let mut chain = GuardChain::new();
    chain.enable(GuardSpec { kind: GuardKind::Deadline, period: Duration::from_millis(200) });

    let last_write = Instant::now();
    // The writer kept the deadline alive through 100ms writes up to this
    // point; restarting the guard on each write is what a live writer would
    // do, and the final restart happens here, at `last_write`.
    chain.restart(GuardKind::Deadline);

    let events = chain.poll(last_write + Duration::from_millis(400));
    assert_eq!(events, vec![GuardEvent::DeadlineMissed]);
}

/// A writer promises data won't outlive it by more than 200ms; with no
/// further writes, the deadline guard keeps reporting a miss every period
/// rather than firing once and going silent.
#[test]
fn deadline_guard_is_periodic_not_one_shot() {
    let mut chain = GuardChain::new();
    chain.enable(GuardSpec { kind: GuardKind::Deadline, period: Duration::from_millis(50) });

    let first = chain.poll(Instant::now() + Duration::from_millis(60));
    assert_eq!(first, vec![GuardEvent::DeadlineMissed]);

    let second = chain.poll(Instant::now() + Duration::from_millis(120));
    assert_eq!(second, vec![GuardEvent::DeadlineMissed], "a still-missing writer keeps missing every period");
}

/// A sample with `lifespan.duration=50ms` is no longer valid 60ms after it
/// was written; the progressive lifespan guard reports exactly one expiry.
#[test]
fn lifespan_expiry_fires_once_past_its_duration() {
    let mut chain = GuardChain::new();
    chain.enable(GuardSpec { kind: GuardKind::Lifespan, period: Duration::from_millis(50) });

    let events = chain.poll(Instant::now() + Duration::from_millis(60));
    assert_eq!(events, vec![GuardEvent::LifespanExpired]);

    // Nothing left armed: a progressive guard doesn't keep re-firing for a
    // sample that already expired.
    assert!(chain.is_empty());
}

/// `assert_liveliness` on a manual-by-participant writer restarts the
/// liveliness guard; within one guard period of the restart it has not
/// reported loss, matching property 5 (Liveliness restore).
#[test]
fn asserting_liveliness_keeps_the_participant_alive() {
    let mut chain = GuardChain::new();
    let period = Duration::from_millis(100);
    chain.enable(GuardSpec { kind: GuardKind::Liveliness, period });

    // Proactive renew fires at 7/8 of the period if nothing asserts liveliness.
    let proactive = chain.poll(Instant::now() + period.mul_f64(0.9));
    assert_eq!(proactive, vec![GuardEvent::LivelinessProactiveRenew]);

    // The application calls assert_liveliness; the caller restarts the chain.
    chain.restart(GuardKind::Liveliness);
    let after_restart = chain.poll(Instant::now() + Duration::from_millis(10));
    assert!(after_restart.is_empty(), "liveliness was restored before the (re-armed) guard could fire");
}

/// With no renewal at all, the liveliness guard eventually reports loss once
/// the full period has elapsed.
#[test]
fn liveliness_is_lost_once_the_full_period_elapses_with_no_renewal() {
    let mut chain = GuardChain::new();
    let period = Duration::from_millis(40);
    chain.enable(GuardSpec { kind: GuardKind::Liveliness, period });

    let enabled_at = Instant::now();
    let proactive = chain.poll(enabled_at + period.mul_f64(0.9));
    assert_eq!(proactive, vec![GuardEvent::LivelinessProactiveRenew]);

    let lost = chain.poll(enabled_at + period + Duration::from_millis(5));
    assert_eq!(lost, vec![GuardEvent::LivelinessLost]);
}
