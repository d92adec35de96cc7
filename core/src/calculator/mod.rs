// Reward Calculator (spec §4.1): pure functions of their inputs alone.
// No I/O, no clock reads — `now` is always supplied by the caller. Given
// identical inputs, output is bit-identical: every formula below is
// written in exactly the left-to-right evaluation order of spec.md so
// two builds of this module can never silently diverge.

use reward_common::config::EngineConfig;
use reward_common::model::{ActivityKind, LevelBand, Phase, Platform, RpTier};
use reward_common::time::TimestampSeconds;

pub mod staking;

use staking::{staking_mining_boost, staking_xp_boost};

/// XP -> mining-rate multiplier, piecewise-linear within each level band
/// (spec §4.1: "XP→mining multiplier is a piecewise-linear table keyed
/// on band"). Level 0 (no credited XP yet) uses the Bronze floor.
pub fn xp_level_multiplier(level: u32) -> f64 {
    const BANDS: [(u32, u32, f64, f64); 5] = [
        (1, 10, 1.00, 1.10),   // Bronze
        (11, 25, 1.10, 1.25),  // Silver
        (26, 50, 1.25, 1.45),  // Gold
        (51, 75, 1.45, 1.70),  // Platinum
        (76, 100, 1.70, 2.00), // Diamond
    ];

    if level == 0 {
        return 1.0;
    }
    if level >= 101 {
        // Mythic: slow continued growth, capped so whales can't runaway
        // the mining rate multiplier indefinitely.
        return (2.0 + 0.01 * (level - 100) as f64).min(3.0);
    }
    for (lo, hi, start, end) in BANDS {
        if level >= lo && level <= hi {
            let frac = (level - lo) as f64 / (hi - lo) as f64;
            return start + (end - start) * frac;
        }
    }
    debug_assert!(
        LevelBand::from_level(level) == LevelBand::Bronze,
        "unreachable band for level {level}"
    );
    1.0
}

/// RP tier -> mining-rate multiplier (spec §4.1 RP tier table).
pub fn rp_tier_multiplier(tier: RpTier) -> f64 {
    1.0 + tier.mining_bonus()
}

fn phase_config<'a>(cfg: &'a EngineConfig, phase: Phase) -> &'a reward_common::config::PhaseConfig {
    &cfg.phases[phase.index()]
}

/// Inputs to `mining_rate`. Everything the formula in spec §4.1 needs,
/// taken by value so the function has no hidden dependencies.
#[derive(Debug, Clone)]
pub struct MiningInput {
    pub phase: Phase,
    pub total_users: u64,
    /// Direct referrals counted toward the bonus, already capped by the
    /// caller at the user's tier network-size cap if applicable.
    pub active_referrals: u32,
    pub kyc_verified: bool,
    pub fin_balance: f64,
    pub level: u32,
    pub rp_tier: RpTier,
    pub staking_amount: f64,
    pub loyalty_months: u32,
    pub human_probability: f64,
    /// Anti-abuse output (spec §4.2): multiplies the mining component
    /// only, applied after all other terms.
    pub difficulty_penalty: f64,
    /// Combined multiplicative effect of active mining-category cards,
    /// including any cross-category synergy bonus (spec §4 Card entity).
    /// 1.0 when no cards are equipped.
    pub card_multiplier: f64,
}

/// spec §4.1 mining rate formula, FIN per hour.
pub fn mining_rate(cfg: &EngineConfig, input: &MiningInput) -> f64 {
    let phase_cfg = phase_config(cfg, input.phase);

    let finizen_term = (phase_cfg.finizen_bonus - input.total_users as f64 / 1_000_000.0).max(1.0);
    let referral_term = 1.0 + 0.1 * (input.active_referrals.min(100) as f64);
    let kyc_term = if input.kyc_verified { 1.2 } else { 0.8 };
    let holdings_regression = (-cfg.regression_k_holdings * input.fin_balance).exp();
    let xp_term = xp_level_multiplier(input.level);
    let rp_term = rp_tier_multiplier(input.rp_tier);
    let staking_term = 1.0 + staking_mining_boost(input.staking_amount, input.loyalty_months);
    let human_term = input.human_probability.clamp(0.1, 1.0);

    phase_cfg.base_rate
        * finizen_term
        * referral_term
        * kyc_term
        * holdings_regression
        * xp_term
        * rp_term
        * staking_term
        * human_term
        * input.card_multiplier
        * input.difficulty_penalty
}

/// Inputs to `xp_gain`.
#[derive(Debug, Clone)]
pub struct XpInput {
    pub kind: ActivityKind,
    pub platform: Platform,
    pub quality_score: f64,
    pub streak_days: u32,
    pub level: u32,
    pub viral: bool,
    pub staking_amount: f64,
    /// Combined multiplicative effect of active xp-category cards.
    pub card_multiplier: f64,
}

fn streak_bonus(streak_days: u32) -> f64 {
    (1.0 + 0.05 * streak_days as f64).min(3.0)
}

/// spec §4.1 XP gain formula, floored to an integer.
pub fn xp_gain(cfg: &EngineConfig, input: &XpInput) -> u64 {
    let base_xp = cfg
        .activity_kinds
        .get(&input.kind)
        .map(|k| k.base_xp)
        .unwrap_or(0.0);
    let platform_multiplier = cfg.platform_multiplier(&input.platform.to_string());
    let quality = input.quality_score.clamp(0.5, 2.0);
    let streak = streak_bonus(input.streak_days);
    let level_decay = (-cfg.k_level * input.level as f64).exp();
    let viral_term = if input.viral { 2.0 } else { 1.0 };
    let staking_term = 1.0 + staking_xp_boost(input.staking_amount);

    let raw = base_xp
        * platform_multiplier
        * quality
        * streak
        * level_decay
        * viral_term
        * staking_term
        * input.card_multiplier;

    raw.max(0.0).floor() as u64
}

/// One referral's contribution to `direct_rp`/`indirect_rp`/`quality`.
#[derive(Debug, Clone)]
pub struct ReferralMemberSnapshot {
    pub total_xp: u64,
    pub level: u32,
    pub last_active_at: TimestampSeconds,
}

#[derive(Debug, Clone)]
pub struct RpInput {
    pub l1: Vec<ReferralMemberSnapshot>,
    pub l2: Vec<ReferralMemberSnapshot>,
    pub l3: Vec<ReferralMemberSnapshot>,
    pub now: TimestampSeconds,
}

/// A referral's activity contribution to `direct_rp`, proportional to
/// how much XP they've accumulated (capped so a single whale referral
/// can't dominate).
fn activity_score(member: &ReferralMemberSnapshot) -> f64 {
    (member.total_xp as f64 / 100.0).min(50.0)
}

/// Exponential recency decay: halves roughly every 30 days of inactivity.
fn time_decay(now: TimestampSeconds, last_active_at: TimestampSeconds) -> f64 {
    let days_inactive = now.saturating_sub(last_active_at) as f64 / 86_400.0;
    (-days_inactive / 30.0).exp()
}

fn avg_level(members: &[ReferralMemberSnapshot]) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    members.iter().map(|m| m.level as f64).sum::<f64>() / members.len() as f64
}

fn active_fraction(members: &[ReferralMemberSnapshot], now: TimestampSeconds) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    let active = members
        .iter()
        .filter(|m| now.saturating_sub(m.last_active_at) <= 30 * 86_400)
        .count();
    active as f64 / members.len() as f64
}

/// spec §4.1 RP value formula, floored to an integer.
pub fn rp_value(cfg: &EngineConfig, input: &RpInput) -> u64 {
    let direct_rp: f64 = input
        .l1
        .iter()
        .map(|m| activity_score(m) * time_decay(input.now, m.last_active_at))
        .sum();

    let indirect_rp = input.l2.len() as f64 * 0.3 * 50.0 + input.l3.len() as f64 * 0.1 * 25.0;

    let all_members: Vec<&ReferralMemberSnapshot> = input
        .l1
        .iter()
        .chain(input.l2.iter())
        .chain(input.l3.iter())
        .collect();
    let network_size = all_members.len();
    let fraction_active = {
        let owned: Vec<ReferralMemberSnapshot> = all_members.iter().map(|m| (*m).clone()).collect();
        active_fraction(&owned, input.now)
    };
    // retention_score: without a separate churn history signal, the
    // retained-after-30-days fraction is the same population used for
    // active_fraction (see DESIGN.md "RP quality term").
    let retention_score = fraction_active;
    let avg_lvl = {
        let owned: Vec<ReferralMemberSnapshot> = all_members.iter().map(|m| (*m).clone()).collect();
        avg_level(&owned)
    };

    let quality = fraction_active * (avg_lvl / 10.0) * retention_score * 10.0;

    let network_quality = fraction_active;
    let regression = (-cfg.regression_k_network * network_size as f64 * network_quality).exp();

    let total = (direct_rp + indirect_rp + quality) * regression;
    total.max(0.0).floor() as u64
}
