// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::time::Duration;

/// TIME_BASED_FILTER QoS policy.
///
/// Reader-side filtering that enforces a minimum separation between
/// accepted samples. A zero separation disables filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBasedFilter {
    pub minimum_separation: Duration,
}

impl Default for TimeBasedFilter {
    fn default() -> Self {
        Self { minimum_separation: Duration::ZERO }
    }
}

impl TimeBasedFilter {
    #[must_use]
    pub fn new(minimum_separation: Duration) -> Self {
        Self { minimum_separation }
    }

    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.minimum_separation == Duration::ZERO
    }

    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        Self { minimum_separation: Duration::from_millis(ms) }
    }
}
