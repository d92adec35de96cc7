// Sliding-window rate limiting (spec §4.2 "Rate-limit layer"), enforced
// before the Anti-Abuse Gate is even consulted. Backed by per-key
// deques of timestamps, trimmed lazily on each check.

use dashmap::DashMap;
use reward_common::{id::UserId, model::ActivityKind, time::TimestampSeconds};
use std::collections::VecDeque;
use std::sync::Mutex;

const HOUR_SECS: TimestampSeconds = 3_600;
const BURST_WINDOW_SECS: TimestampSeconds = 600; // 10 minutes

pub struct RateLimiter {
    per_kind: DashMap<(UserId, ActivityKind), Mutex<VecDeque<TimestampSeconds>>>,
    all_kinds: DashMap<UserId, Mutex<VecDeque<TimestampSeconds>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter {
            per_kind: DashMap::new(),
            all_kinds: DashMap::new(),
        }
    }
}

/// Converts a daily per-kind limit into an hourly sliding-window limit
/// (spec §4.1: "per-kind N values ... converted to hourly"). `None`
/// (unlimited kind, e.g. `post`) stays unlimited.
pub fn hourly_limit_from_daily(daily_limit: Option<u32>) -> Option<u32> {
    daily_limit.map(|d| (d as f64 / 24.0).ceil().max(1.0) as u32)
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Err(reset_at)` if the per-(user, kind) hourly window is
    /// already full; otherwise records this event and returns `Ok(())`.
    pub fn check_and_record(
        &self,
        user_id: UserId,
        kind: ActivityKind,
        now: TimestampSeconds,
        hourly_limit: Option<u32>,
    ) -> Result<(), TimestampSeconds> {
        let Some(limit) = hourly_limit else {
            return Ok(());
        };
        let entry = self
            .per_kind
            .entry((user_id, kind))
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut window = entry.lock().expect("rate limiter lock poisoned");
        while let Some(&front) = window.front() {
            if now.saturating_sub(front) > HOUR_SECS {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() as u32 >= limit {
            let reset_at = window.front().copied().unwrap_or(now) + HOUR_SECS;
            return Err(reset_at);
        }
        window.push_back(now);
        Ok(())
    }

    /// Records this event in the user's global (any-kind) burst window
    /// and returns how many events fall within the last 10 minutes,
    /// including this one (spec §4.2 "Cooling periods").
    pub fn record_burst(&self, user_id: UserId, now: TimestampSeconds) -> usize {
        let entry = self
            .all_kinds
            .entry(user_id)
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut window = entry.lock().expect("rate limiter lock poisoned");
        while let Some(&front) = window.front() {
            if now.saturating_sub(front) > BURST_WINDOW_SECS {
                window.pop_front();
            } else {
                break;
            }
        }
        window.push_back(now);
        window.len()
    }
}
