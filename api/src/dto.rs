// Wire types for the ingestion facade (spec §6). These are pure
// serde structs; no business logic lives here — routes.rs translates
// them into `reward_core` calls and back.

use reward_common::model::{ActivityKind, Platform, RpTier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityRequest {
    pub user_id: String,
    pub kind: ActivityKind,
    pub platform: Platform,
    pub content_ref: Option<String>,
    #[serde(default)]
    pub engagement: EngagementRequest,
    pub client_fingerprint: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngagementRequest {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityResponse {
    pub event_id: String,
    pub accepted: bool,
    pub delta_fin: f64,
    pub delta_xp: u64,
    pub delta_rp: u64,
    pub new_level: Option<u32>,
    pub new_rp_tier: Option<RpTier>,
    pub human_probability: Option<f64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStateResponse {
    pub user_id: String,
    pub fin_balance: f64,
    pub total_xp: u64,
    pub total_rp: u64,
    pub level: u32,
    pub rp_tier: RpTier,
    pub xp_multiplier: f64,
    pub rp_tier_multiplier: f64,
    pub pending_settlement_fin: f64,
    pub eligibility: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferralLinkRequest {
    pub new_user_id: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralLinkResponse {
    pub linked: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub queue_depth: usize,
    pub queue_high_water: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub reason: Option<String>,
    pub reset_at: Option<u64>,
}
