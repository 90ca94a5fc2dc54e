//! Injectable wall clock (spec §1 external collaborators: `Clock`).
//!
//! Every calendar-aligned computation (quota windows, cache TTL expiry,
//! leaderboard staleness) reads time through this trait instead of calling
//! `Utc::now()` directly, so tests can pin time without sleeping.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the OS wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that only advances when told to.
///
/// Grounded in the same "`ManualClock`" pattern the teacher exposes behind its
/// `test-utils` feature for pipeline tests that need to cross a time boundary
/// (e.g. a quota window rollover) without a real sleep.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: std::sync::Arc<std::sync::Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: std::sync::Arc::new(std::sync::Mutex::new(start)),
        }
    }

    pub fn set(&self, when: DateTime<Utc>) {
        *self.inner.lock().expect("manual clock poisoned") = when;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.inner.lock().expect("manual clock poisoned");
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock().expect("manual clock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_demand() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(chrono::Duration::hours(2));
        assert_eq!(clock.now(), start + chrono::Duration::hours(2));
    }
}
