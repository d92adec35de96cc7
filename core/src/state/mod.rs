pub mod store;
pub mod types;

pub use store::{
    AccrualLog, CardStore, DailyCounterStore, InMemoryStateStore, NetworkSnapshotCache,
    ReferralStore, UserStore,
};
pub use types::{
    AccrualRecord, Card, CardStatus, DailyCounter, EdgeDepth, MiningEligibility, NetworkSnapshot,
    ReferralEdge, User,
};
