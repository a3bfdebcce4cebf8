// SPDX-License-Identifier: MIT

//! Clock abstraction so the auto-scaler's cadence and cooldown can be driven
//! deterministically in tests instead of sleeping on the wall clock.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of "now" for components with time-based behavior (the task
/// queue's auto-scaler, engine readiness polling).
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only advances when told to, for deterministic scheduling
/// tests (auto-scaler cooldown, engine readiness timeout).
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<Instant>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.inner.lock();
        *guard += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.inner.lock()
    }
}
