//! Temporal types for belief validity and injectable time.
//!
//! Beliefs carry a half-open validity interval `[valid_from, valid_to)`;
//! an open end means "currently active". All decay and day-counting math is
//! a pure function of stored timestamps and an injected clock, so the engine
//! never needs a background ticker and tests can travel in time.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A half-open validity interval `[from, to)`.
///
/// `to = None` means the interval is open-ended — the belief is currently
/// held. Supersession closes the interval at the supersession time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Validity {
    /// Start of the interval (inclusive).
    pub from: DateTime<Utc>,

    /// End of the interval (exclusive). None means open-ended.
    pub to: Option<DateTime<Utc>>,
}

impl Validity {
    /// Creates a closed validity interval.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidValidityRange` if `from >= to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, ValidationError> {
        if from >= to {
            return Err(ValidationError::InvalidValidityRange { from, to });
        }
        Ok(Self { from, to: Some(to) })
    }

    /// Creates an open-ended interval starting at the given time.
    #[must_use]
    pub const fn starting_at(from: DateTime<Utc>) -> Self {
        Self { from, to: None }
    }

    /// Returns true if the interval has no end.
    #[must_use]
    pub const fn is_open_ended(&self) -> bool {
        self.to.is_none()
    }

    /// Check if a timestamp falls within `[from, to)`.
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.from && self.to.map_or(true, |to| time < to)
    }

    /// Returns true if the interval is active at the given instant.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.contains(now)
    }

    /// Closes an open-ended interval at the given time.
    ///
    /// The end is clamped so it never precedes the start; closing an already
    /// closed interval never extends it.
    pub fn close_at(&mut self, at: DateTime<Utc>) {
        let end = std::cmp::max(at, self.from + Duration::microseconds(1));
        self.to = Some(match self.to {
            Some(existing) => existing.min(end),
            None => end,
        });
    }

    /// Duration of the interval, if closed.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.to.map(|to| to - self.from)
    }
}

/// Source of "now" for every time-dependent computation in the engine.
///
/// Production code uses [`SystemClock`]; tests use [`ManualClock`] to replay
/// echo decay, tension day-counting, and daily rollovers deterministically.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Intended for tests and offline replay of historical state.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a manual clock pinned at the given instant.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Moves the clock forward by the given duration.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().expect("manual clock lock poisoned");
        *now = *now + by;
    }

    /// Moves the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }

    /// Pins the clock to an exact instant.
    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.write().expect("manual clock lock poisoned");
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().expect("manual clock lock poisoned")
    }
}

/// Fractional days elapsed between two instants.
///
/// Used by echo decay and tension day-counting; negative spans clamp to zero
/// so a skewed caller clock can never produce a strengthening echo.
#[must_use]
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let seconds = (later - earlier).num_milliseconds() as f64 / 1000.0;
    (seconds / 86_400.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_validity_new_rejects_inverted() {
        let now = t0();
        let result = Validity::new(now + Duration::hours(1), now);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidValidityRange { .. })
        ));
    }

    #[test]
    fn test_validity_open_ended_contains_future() {
        let v = Validity::starting_at(t0());
        assert!(v.is_open_ended());
        assert!(v.contains(t0() + Duration::days(365)));
        assert!(!v.contains(t0() - Duration::seconds(1)));
    }

    #[test]
    fn test_validity_half_open_excludes_end() {
        let v = Validity::new(t0(), t0() + Duration::days(1)).unwrap();
        assert!(v.contains(t0()));
        assert!(!v.contains(t0() + Duration::days(1)));
    }

    #[test]
    fn test_close_at_clamps_before_start() {
        let mut v = Validity::starting_at(t0());
        v.close_at(t0() - Duration::days(1));
        let to = v.to.unwrap();
        assert!(to > v.from);
    }

    #[test]
    fn test_close_at_never_extends() {
        let mut v = Validity::new(t0(), t0() + Duration::days(1)).unwrap();
        v.close_at(t0() + Duration::days(10));
        assert_eq!(v.to.unwrap(), t0() + Duration::days(1));
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(t0());
        assert_eq!(clock.now(), t0());
        clock.advance_days(14);
        assert_eq!(clock.now(), t0() + Duration::days(14));
    }

    #[test]
    fn test_days_between() {
        let from = t0();
        assert!((days_between(from, from + Duration::days(30)) - 30.0).abs() < 1e-9);
        assert!((days_between(from, from + Duration::hours(12)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_days_between_clamps_negative() {
        let from = t0();
        assert_eq!(days_between(from, from - Duration::days(3)), 0.0);
    }
}
