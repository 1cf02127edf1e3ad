// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction, so retention windows and timestamps are testable
//! without sleeping real time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, in whole seconds since the Unix epoch.
///
/// `Device::added_at` / `delete_after` and the config-hash freshness
/// checks all go through this instead of calling `SystemTime::now()`
/// directly, so tests can control elapsed time deterministically.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> u64;
}

/// Real wall-clock time.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Controllable clock for tests.
#[derive(Clone)]
pub struct FakeClock {
    secs: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new(start_secs: u64) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(start_secs)),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(50);
        assert_eq!(clock.now(), 150);
    }

    #[test]
    fn fake_clock_set() {
        let clock = FakeClock::new(0);
        clock.set(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn system_clock_is_nonzero() {
        assert!(SystemClock.now() > 0);
    }
}
