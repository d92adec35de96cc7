// Shared domain enums (spec §3). Kept in `reward_common` rather than
// `reward_core` so the HTTP façade can (de)serialize wire requests
// without depending on the coordinator's internals.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ActivityKind {
    Post,
    Photo,
    Video,
    Story,
    Comment,
    Like,
    Share,
    Follow,
    DailyLogin,
    Quest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    Tiktok,
    Instagram,
    Youtube,
    Facebook,
    X,
    Internal,
}

/// XP level tier band (spec §4.1). Pure function of `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelBand {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Mythic,
}

impl LevelBand {
    pub fn from_level(level: u32) -> Self {
        match level {
            1..=10 => LevelBand::Bronze,
            11..=25 => LevelBand::Silver,
            26..=50 => LevelBand::Gold,
            51..=75 => LevelBand::Platinum,
            76..=100 => LevelBand::Diamond,
            _ => LevelBand::Mythic,
        }
    }
}

/// RP tier (spec §4.1). Pure function of `total_rp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RpTier {
    Explorer,
    Connector,
    Influencer,
    Leader,
    Ambassador,
}

impl RpTier {
    pub fn from_total_rp(total_rp: u64) -> Self {
        match total_rp {
            0..=999 => RpTier::Explorer,
            1_000..=4_999 => RpTier::Connector,
            5_000..=14_999 => RpTier::Influencer,
            15_000..=49_999 => RpTier::Leader,
            _ => RpTier::Ambassador,
        }
    }

    /// Mining multiplier bonus, e.g. Connector => 0.20 (+20%).
    pub fn mining_bonus(&self) -> f64 {
        match self {
            RpTier::Explorer => 0.0,
            RpTier::Connector => 0.20,
            RpTier::Influencer => 0.50,
            RpTier::Leader => 1.00,
            RpTier::Ambassador => 2.00,
        }
    }

    /// Network size cap gating how many direct referrals count toward
    /// `active_referrals` in the mining formula.
    pub fn network_size_cap(&self) -> Option<u32> {
        match self {
            RpTier::Explorer => Some(10),
            RpTier::Connector => Some(25),
            RpTier::Influencer => Some(50),
            RpTier::Leader => Some(100),
            RpTier::Ambassador => None,
        }
    }
}

/// Global epoch driven by total user count (spec §4.1, §4 glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    One,
    Two,
    Three,
    Four,
}

impl Phase {
    pub fn index(&self) -> usize {
        match self {
            Phase::One => 0,
            Phase::Two => 1,
            Phase::Three => 2,
            Phase::Four => 3,
        }
    }

    /// Phase is a monotone, sticky function of `total_users` — it never
    /// regresses even if `total_users` were to (it shouldn't).
    pub fn from_total_users(total_users: u64, thresholds: &[u64; 3]) -> Self {
        if total_users < thresholds[0] {
            Phase::One
        } else if total_users < thresholds[1] {
            Phase::Two
        } else if total_users < thresholds[2] {
            Phase::Three
        } else {
            Phase::Four
        }
    }

    /// Never move to an earlier phase than `current`.
    pub fn advance(current: Phase, total_users: u64, thresholds: &[u64; 3]) -> Phase {
        let computed = Phase::from_total_users(total_users, thresholds);
        computed.max(current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    Mining,
    Xp,
    Referral,
}
