// User mining-eligibility state machine (spec §4.6):
// `Unverified -> Verified -> Active -> Cooling -> Frozen`. Only `Active`
// permits credits; `Cooling` is automatic and self-expiring, `Frozen` is
// admin-reversible.

use crate::state::types::{MiningEligibility, User};
use reward_common::time::TimestampSeconds;

/// KYC completion: `Unverified -> Verified`. A no-op once already past
/// this stage.
pub fn complete_kyc(user: &mut User) {
    if user.eligibility == MiningEligibility::Unverified {
        user.eligibility = MiningEligibility::Verified;
    }
    user.kyc_verified = true;
}

/// First successful claim: `Verified -> Active`.
pub fn first_claim(user: &mut User) {
    if user.eligibility == MiningEligibility::Verified {
        user.eligibility = MiningEligibility::Active;
    }
}

/// Automatic transition after a high-activity burst (spec §4.2 "Cooling
/// periods"): `Active -> Cooling` until `until`.
pub fn enter_cooldown(user: &mut User, until: TimestampSeconds) {
    if user.eligibility == MiningEligibility::Active {
        user.eligibility = MiningEligibility::Cooling;
        user.cooling_until = Some(until);
    }
}

/// Called opportunistically (e.g. on the next credit attempt) to let a
/// cooldown lapse back to `Active` once its window has passed.
pub fn maybe_exit_cooldown(user: &mut User, now: TimestampSeconds) {
    if user.eligibility == MiningEligibility::Cooling {
        if let Some(until) = user.cooling_until {
            if now >= until {
                user.eligibility = MiningEligibility::Active;
                user.cooling_until = None;
            }
        }
    }
}

/// Records a low-human-probability verdict and freezes mining credits
/// once it has happened twice within 24h (spec §4.2 "confirmed bot
/// determination"), for `freeze_duration_secs` (spec §4.2 "7-day
/// freeze"). Returns `true` if this call caused a freeze.
pub fn record_bot_flag(
    user: &mut User,
    now: TimestampSeconds,
    human_probability: f64,
    bot_confirmation_threshold: f64,
    freeze_duration_secs: u64,
) -> bool {
    if human_probability >= bot_confirmation_threshold {
        return false;
    }
    user.recent_bot_flags.retain(|&t| now.saturating_sub(t) <= 86_400);
    user.recent_bot_flags.push(now);
    if user.recent_bot_flags.len() >= 2 {
        user.eligibility = MiningEligibility::Frozen;
        user.frozen_until = Some(now + freeze_duration_secs);
        return true;
    }
    false
}

/// Automatic expiry of a confirmed-bot freeze once `freeze_duration_secs`
/// has elapsed (spec §4.2 "7-day freeze"), called opportunistically the
/// same way `maybe_exit_cooldown` is.
pub fn maybe_exit_freeze(user: &mut User, now: TimestampSeconds) {
    if user.eligibility == MiningEligibility::Frozen {
        if let Some(until) = user.frozen_until {
            if now >= until {
                user.eligibility = MiningEligibility::Active;
                user.frozen_until = None;
                user.recent_bot_flags.clear();
            }
        }
    }
}

/// Admin-reversible unfreeze (spec §4.6: "confirmed bot ... admin-
/// reversible"), usable ahead of the automatic expiry above.
pub fn admin_unfreeze(user: &mut User) {
    if user.eligibility == MiningEligibility::Frozen {
        user.eligibility = MiningEligibility::Active;
        user.recent_bot_flags.clear();
        user.frozen_until = None;
    }
}
