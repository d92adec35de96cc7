// Shared process state handed to every route (spec §2 "Process/runtime
// shape"). Owns no business logic; routes.rs is the only caller of
// `reward_core` from this crate.

use reward_common::{config::ConfigHandle, time::Clock};
use reward_core::collaborators::{AlwaysHumanScorer, ContentQualityScorer, QueuedSettlementAdapter};
use reward_core::coordinator::{AccrualCoordinator, Stores};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

pub type Coordinator = AccrualCoordinator<AlwaysHumanScorer, QueuedSettlementAdapter>;

pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub stores: Stores,
    pub quality_scorer: Arc<dyn ContentQualityScorer>,
    pub clock: Arc<dyn Clock>,
    pub config: ConfigHandle,
    /// In-flight request count, the facade's stand-in for
    /// `core::ingestion`'s queue depth (spec §5 Backpressure):
    /// incremented around each `/activity` credit, consulted by
    /// `should_shed` before the request is allowed to proceed.
    pub in_flight: Arc<AtomicUsize>,
}
