// Durable entities (spec §3). These are plain data; all mutation goes
// through the Accrual Coordinator (core::coordinator), which is the only
// writer of User, DailyCounter and AccrualRecord (spec §4.3).

use reward_common::{
    id::{EventId, UserId},
    model::{ActivityKind, CardCategory, Phase, RpTier},
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User mining-eligibility state machine (spec §4.6). Only `Active`
/// permits credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MiningEligibility {
    Unverified,
    Verified,
    Active,
    Cooling,
    Frozen,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub fin_balance: f64,
    pub total_xp: u64,
    pub total_rp: u64,
    pub streak_days: u32,
    pub last_active_at: TimestampSeconds,
    pub kyc_verified: bool,
    pub human_probability: f64,
    pub staking_amount: f64,
    pub staking_started_at: Option<TimestampSeconds>,
    pub referrer_id: Option<UserId>,
    pub eligibility: MiningEligibility,
    /// Automatic Cooling expiry; None unless currently cooling.
    pub cooling_until: Option<TimestampSeconds>,
    /// Timestamps of the user's last low-human-probability verdicts
    /// (< bot_confirmation_threshold), used to detect "twice within 24h"
    /// (spec §4.2 Cooling periods).
    pub recent_bot_flags: Vec<TimestampSeconds>,
    /// Automatic Frozen expiry (spec §4.2 "7-day freeze"); None unless
    /// currently frozen.
    pub frozen_until: Option<TimestampSeconds>,
    /// Accrued since the last settlement hand-off; kept separate from
    /// `fin_balance` bookkeeping is unnecessary since fin_balance is
    /// monotonic, but pending is tracked so a settlement re-read cannot
    /// double count an amount already handed to the blockchain adapter
    /// (spec §4.5).
    pub pending_settlement_fin: f64,
    pub settlement_nonce: u64,
    pub last_confirmed_tx: Option<String>,
}

impl User {
    pub fn new(id: UserId, now: TimestampSeconds) -> Self {
        User {
            id,
            fin_balance: 0.0,
            total_xp: 0,
            total_rp: 0,
            streak_days: 0,
            last_active_at: now,
            kyc_verified: false,
            human_probability: 1.0,
            staking_amount: 0.0,
            staking_started_at: None,
            referrer_id: None,
            eligibility: MiningEligibility::Unverified,
            cooling_until: None,
            recent_bot_flags: Vec::new(),
            frozen_until: None,
            pending_settlement_fin: 0.0,
            settlement_nonce: 0,
            last_confirmed_tx: None,
        }
    }

    /// level = floor(sqrt(total_xp / 100)) (spec §4.1), clamped to >= 1
    /// for band lookups (level 0 users are pre-first-credit and use
    /// Bronze's multiplier).
    pub fn level(&self) -> u32 {
        ((self.total_xp as f64 / 100.0).sqrt().floor()) as u32
    }

    pub fn rp_tier(&self) -> RpTier {
        RpTier::from_total_rp(self.total_rp)
    }

    pub fn can_be_credited(&self) -> bool {
        matches!(self.eligibility, MiningEligibility::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DailyCounter {
    pub user_id_hex: String,
    pub date: u64,
    pub per_kind_counts: HashMap<ActivityKind, u32>,
    pub cumulative_xp: u64,
    /// Stored as milli-FIN (integer) to keep the daily cap comparison
    /// exact instead of accumulating floating point error across many
    /// small credits in one day.
    pub cumulative_fin_milli: u64,
}

impl DailyCounter {
    pub fn count_for(&self, kind: ActivityKind) -> u32 {
        self.per_kind_counts.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EdgeDepth {
    L1 = 1,
    L2 = 2,
    L3 = 3,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferralEdge {
    pub referrer_id: UserId,
    pub referred_id: UserId,
    pub depth: EdgeDepth,
    pub created_at: TimestampSeconds,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSnapshot {
    pub total_users: u64,
    pub active_users_30d: u64,
    pub current_phase: Phase,
    pub updated_at: TimestampSeconds,
}

impl Default for NetworkSnapshot {
    fn default() -> Self {
        NetworkSnapshot {
            total_users: 0,
            active_users_30d: 0,
            current_phase: Phase::One,
            updated_at: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardStatus {
    Minted,
    Equipped,
    Consumed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: u64,
    pub owner_id: UserId,
    pub category: CardCategory,
    pub effect_multiplier: f64,
    pub duration_ms: u64,
    pub uses_remaining: u32,
    pub expires_at: Option<TimestampSeconds>,
    pub status: CardStatus,
}

impl Card {
    pub fn is_active(&self, now: TimestampSeconds) -> bool {
        if self.status != CardStatus::Equipped {
            return false;
        }
        match self.expires_at {
            Some(exp) => now < exp,
            None => true,
        }
    }
}

/// Append-only audit record (spec §3). Exactly one per successfully
/// credited event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccrualRecord {
    pub event_id: EventId,
    pub user_id: UserId,
    pub fin_delta: f64,
    pub xp_delta: u64,
    pub rp_delta: u64,
    pub applied_multipliers: serde_json::Value,
    pub created_at: TimestampSeconds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_floor_sqrt_xp_over_100() {
        let mut user = User::new(UserId::zero(), 0);
        user.total_xp = 0;
        assert_eq!(user.level(), 0);
        user.total_xp = 399;
        assert_eq!(user.level(), 1);
        user.total_xp = 10_000;
        assert_eq!(user.level(), 10);
    }

    #[test]
    fn card_expired_is_not_active() {
        let card = Card {
            id: 1,
            owner_id: UserId::zero(),
            category: CardCategory::Mining,
            effect_multiplier: 1.5,
            duration_ms: 0,
            uses_remaining: 1,
            expires_at: Some(100),
            status: CardStatus::Equipped,
        };
        assert!(card.is_active(50));
        assert!(!card.is_active(150));
    }
}
