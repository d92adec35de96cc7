// External collaborator contracts (spec §6). The core only ever talks
// to these traits; concrete OAuth scraping, ML scoring and chain
// submission live outside this repository. Each trait ships the
// documented degraded-mode fallback so the engine runs standalone.

use async_trait::async_trait;
use reward_common::id::UserId;
use reward_common::model::{ActivityKind, Platform};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFeatures {
    pub account_age_days: u32,
    pub kyc_verified: bool,
    pub historical_human_probability: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFeatures {
    pub kind: Option<ActivityKind>,
    pub platform: Option<Platform>,
    pub content_fingerprint: String,
    pub device_fingerprint: String,
    pub events_last_10_min: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub human_probability: f64,
    pub penalty: f64,
    pub reason_code: String,
}

/// §6 "Anti-Bot Scorer (collaborator, synchronous interface)". Modeled
/// as async here because the core always awaits it before acquiring the
/// per-user lock (spec §5): a remote scorer call never serializes
/// unrelated events for the same user.
#[async_trait]
pub trait AntiBotScorer: Send + Sync {
    async fn score(&self, user: &UserFeatures, event: &EventFeatures) -> ScoreResult;
}

/// Degraded-mode fallback mandated by §6: always human, clearly logged.
pub struct AlwaysHumanScorer;

#[async_trait]
impl AntiBotScorer for AlwaysHumanScorer {
    async fn score(&self, _user: &UserFeatures, _event: &EventFeatures) -> ScoreResult {
        log::warn!("anti-bot scorer unavailable; falling back to human_probability=1.0");
        ScoreResult {
            human_probability: 1.0,
            penalty: 0.0,
            reason_code: "fallback_always_human".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityResult {
    pub quality: f64,
    pub originality: f64,
    pub brand_safety: f64,
}

/// §6 "Content Quality Scorer (collaborator)".
#[async_trait]
pub trait ContentQualityScorer: Send + Sync {
    async fn analyze(
        &self,
        content_ref: &str,
        platform: Platform,
        kind: ActivityKind,
    ) -> QualityResult;
}

/// Fallback mandated by §6: quality = 1.0 on failure.
pub struct NeutralQualityScorer;

#[async_trait]
impl ContentQualityScorer for NeutralQualityScorer {
    async fn analyze(
        &self,
        _content_ref: &str,
        _platform: Platform,
        _kind: ActivityKind,
    ) -> QualityResult {
        QualityResult {
            quality: 1.0,
            originality: 1.0,
            brand_safety: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub user_id: UserId,
    pub amount_fin: f64,
    pub nonce: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub tx_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("settlement sink unavailable: {0}")]
    Unavailable(String),
}

/// §6 "Blockchain Settlement Adapter (collaborator, asynchronous
/// interface)". The real adapter owns retries; nonce strictly
/// increasing per user is the core's responsibility (see
/// core::settlement).
#[async_trait]
pub trait SettlementAdapter: Send + Sync {
    async fn submit(&self, request: SettlementRequest) -> Result<SettlementReceipt, SettlementError>;
}

/// Stand-in for "a reliable queued sink" (spec §1): accepts every
/// request, assigns a deterministic-looking fake tx id, and logs that no
/// real chain submission is wired up.
pub struct QueuedSettlementAdapter {
    next_fake_tx: AtomicU64,
    submitted: Mutex<Vec<SettlementRequest>>,
}

impl Default for QueuedSettlementAdapter {
    fn default() -> Self {
        QueuedSettlementAdapter {
            next_fake_tx: AtomicU64::new(1),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl QueuedSettlementAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().expect("settlement queue poisoned").len()
    }
}

#[async_trait]
impl SettlementAdapter for QueuedSettlementAdapter {
    async fn submit(&self, request: SettlementRequest) -> Result<SettlementReceipt, SettlementError> {
        log::warn!(
            "no blockchain settlement adapter configured; queuing {} FIN for user {} (nonce {}) in memory",
            request.amount_fin,
            request.user_id,
            request.nonce
        );
        let tx_seq = self.next_fake_tx.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .expect("settlement queue poisoned")
            .push(request);
        Ok(SettlementReceipt {
            tx_id: format!("queued-{tx_seq}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_human_scorer_is_fully_trusting() {
        let scorer = AlwaysHumanScorer;
        let result = scorer
            .score(&UserFeatures::default(), &EventFeatures::default())
            .await;
        assert_eq!(result.human_probability, 1.0);
    }

    #[tokio::test]
    async fn neutral_quality_scorer_returns_unit_quality() {
        let scorer = NeutralQualityScorer;
        let result = scorer
            .analyze("ref", Platform::Instagram, ActivityKind::Post)
            .await;
        assert_eq!(result.quality, 1.0);
    }

    #[tokio::test]
    async fn queued_settlement_adapter_assigns_increasing_tx_ids() {
        let adapter = QueuedSettlementAdapter::new();
        let req = SettlementRequest {
            user_id: UserId::zero(),
            amount_fin: 0.5,
            nonce: 1,
        };
        let r1 = adapter.submit(req.clone()).await.unwrap();
        let r2 = adapter.submit(req).await.unwrap();
        assert_ne!(r1.tx_id, r2.tx_id);
        assert_eq!(adapter.submitted_count(), 2);
    }
}
