// Anti-Abuse Gate (spec §4.2). Stateless scorer wrapper plus the
// accept/reject policy; the sliding-window rate limiter (core::ratelimit)
// runs before this gate is even consulted.

use crate::collaborators::{AntiBotScorer, EventFeatures, UserFeatures};
use reward_common::{config::EngineConfig, error::EngineError, model::ActivityKind};

/// Activities that require the stricter soft threshold (spec §4.2:
/// "privileged action (referral creation, claim, profile change)").
/// Ordinary activity-stream credits only need the hard threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPrivilege {
    Ordinary,
    Privileged,
}

#[derive(Debug, Clone)]
pub struct GateDecision {
    pub human_probability: f64,
    pub difficulty_penalty: f64,
}

/// A gate rejection, carrying the scorer's verdict alongside the error
/// so the caller can still record a confirmed-bot determination (spec
/// §4.2) even though the event itself is refused.
#[derive(Debug, Clone)]
pub struct GateRejection {
    pub error: EngineError,
    pub human_probability: f64,
}

pub struct AntiAbuseGate<S: AntiBotScorer> {
    scorer: S,
}

impl<S: AntiBotScorer> AntiAbuseGate<S> {
    pub fn new(scorer: S) -> Self {
        AntiAbuseGate { scorer }
    }

    /// spec §4.2 policy: reject below the hard threshold; reject
    /// privileged actions below the soft threshold; otherwise accept
    /// and forward the probability to the calculator. `fin_balance`
    /// scales the difficulty penalty (mining-only multiplier).
    pub async fn evaluate(
        &self,
        cfg: &EngineConfig,
        user: &UserFeatures,
        event: &EventFeatures,
        privilege: ActionPrivilege,
        fin_balance: f64,
    ) -> Result<GateDecision, GateRejection> {
        let score = self.scorer.score(user, event).await;

        if score.human_probability < cfg.anti_bot_hard_threshold {
            return Err(GateRejection {
                error: EngineError::AntiBotRejected {
                    reason_code: "below_hard_threshold".to_string(),
                },
                human_probability: score.human_probability,
            });
        }
        if privilege == ActionPrivilege::Privileged
            && score.human_probability < cfg.anti_bot_soft_threshold
        {
            return Err(GateRejection {
                error: EngineError::AntiBotRejected {
                    reason_code: "below_soft_threshold_privileged".to_string(),
                },
                human_probability: score.human_probability,
            });
        }

        let difficulty_penalty = (1.0 - (cfg.regression_k_holdings * fin_balance)).clamp(0.1, 1.0);

        Ok(GateDecision {
            human_probability: score.human_probability,
            difficulty_penalty,
        })
    }
}

/// Every `ActivityKind` (spec §3) is an ordinary content/engagement
/// action; "privileged" covers referral-link creation, claims and
/// profile changes, which are separate request types handled directly
/// by the callers that reach for `ActionPrivilege::Privileged`.
pub fn privilege_of(_kind: ActivityKind) -> ActionPrivilege {
    ActionPrivilege::Ordinary
}
