// Time types and the Clock abstraction.
//
// IMPORTANT: the Reward Calculator (reward_core::calculator) must never
// read the system clock itself — every formula takes `now` as a plain
// value so that two evaluations against the same snapshot are
// bit-identical. SystemClock below is the *only* place SystemTime::now()
// is read; everything downstream of it is a value.

use std::time::{SystemTime, UNIX_EPOCH};

/// Timestamp in whole seconds since the Unix epoch.
pub type TimestampSeconds = u64;

/// Source of the current time, injected at the ingestion boundary.
///
/// Production code uses `SystemClock`; tests use a `FixedClock` or a
/// hand-rolled stepping clock so that phase transitions, streaks and
/// cooldowns are exercised deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimestampSeconds;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampSeconds {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs()
    }
}

/// A clock that always returns a fixed instant. Useful for property
/// tests that need a stable `now` across many calculator invocations.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub TimestampSeconds);

impl Clock for FixedClock {
    fn now(&self) -> TimestampSeconds {
        self.0
    }
}

/// Number of whole UTC days since the epoch, used to key `DailyCounter`
/// rows and to detect midnight rollover.
pub fn utc_day(timestamp: TimestampSeconds) -> u64 {
    timestamp / 86_400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_day_buckets_correctly() {
        assert_eq!(utc_day(0), 0);
        assert_eq!(utc_day(86_399), 0);
        assert_eq!(utc_day(86_400), 1);
    }

    #[test]
    fn fixed_clock_is_stable() {
        let c = FixedClock(1_000);
        assert_eq!(c.now(), c.now());
    }
}
