// ActivityEvent (spec §3): immutable once recorded, credited exactly
// once keyed by event id.

use reward_common::{
    id::{EventId, UserId},
    model::{ActivityKind, Platform},
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Engagement {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

impl Engagement {
    /// spec §4.1: "viral iff engagement.views >= 1000".
    pub fn is_viral(&self) -> bool {
        self.views >= 1000
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub kind: ActivityKind,
    pub platform: Platform,
    /// clamp(0.5, 2.0) at the calculator boundary regardless of what the
    /// content scorer returned.
    pub quality_score: f64,
    pub timestamp: TimestampSeconds,
    pub external_ref: Option<String>,
    pub engagement: Engagement,
}

impl ActivityEvent {
    pub fn clamped_quality(&self) -> f64 {
        self.quality_score.clamp(0.5, 2.0)
    }
}
