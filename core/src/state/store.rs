// State store traits (spec §3 persistence layout) with an in-memory
// implementation backed by `dashmap`, mirroring the teacher's pluggable
// storage-provider traits (core::storage) — a durable backend (sled /
// rocksdb, both already teacher dependencies) is a drop-in
// implementation of the same traits.

use super::types::{AccrualRecord, Card, DailyCounter, NetworkSnapshot, ReferralEdge, User};
use dashmap::DashMap;
use reward_common::{
    id::{EventId, UserId},
    time::TimestampSeconds,
};
use std::sync::{Arc, RwLock};

pub trait UserStore: Send + Sync {
    fn get(&self, id: &UserId) -> Option<User>;
    fn get_or_create(&self, id: &UserId, now: TimestampSeconds) -> User;
    fn put(&self, user: User);
    /// Total registered users, read by the periodic NetworkSnapshot
    /// refresh (spec §5 "NetworkSnapshot ... refreshed on a timer") to
    /// drive `Phase::advance`.
    fn total_count(&self) -> u64;
    /// Users active within the last `since` seconds (by `last_active_at`).
    fn active_count(&self, since: TimestampSeconds) -> u64;
}

pub trait DailyCounterStore: Send + Sync {
    fn get(&self, user_id: &UserId, date: u64) -> DailyCounter;
    fn put(&self, user_id: &UserId, counter: DailyCounter);
}

pub trait AccrualLog: Send + Sync {
    /// Returns the existing record if one is already present for this
    /// event id (idempotency, spec §4.3 step 3), otherwise inserts and
    /// returns None.
    fn insert_if_absent(&self, record: AccrualRecord) -> Option<AccrualRecord>;
    fn get(&self, event_id: &EventId) -> Option<AccrualRecord>;
    /// Ordered replay of the whole log, oldest first — used by the
    /// "replay reproduces current balances" property test (spec §8).
    fn all_ordered(&self) -> Vec<AccrualRecord>;
}

pub trait ReferralStore: Send + Sync {
    /// Fails (returns false) if inserting this edge would create a
    /// cycle or a second L1 parent for `referred_id` (spec §3 invariant:
    /// checked by constructor).
    fn insert(&self, edge: ReferralEdge) -> bool;
    fn direct_referrer(&self, user_id: &UserId) -> Option<UserId>;
    fn direct_referrals(&self, referrer_id: &UserId) -> Vec<UserId>;
    /// Ancestors at depth 1..=3 reachable by walking `direct_referrer`
    /// upward, breadth-first, depth-bounded by construction.
    fn ancestors(&self, user_id: &UserId) -> Vec<(UserId, u8)>;
}

pub trait NetworkSnapshotCache: Send + Sync {
    fn get(&self) -> NetworkSnapshot;
    fn set(&self, snapshot: NetworkSnapshot);
}

pub trait CardStore: Send + Sync {
    fn active_cards_for(&self, owner_id: &UserId, now: TimestampSeconds) -> Vec<Card>;
    fn put(&self, card: Card);
}

/// Single in-memory implementation of every store trait, sharing nothing
/// but `Arc<DashMap<..>>` handles so it is cheap to clone and hand to
/// worker tasks.
#[derive(Clone)]
pub struct InMemoryStateStore {
    users: Arc<DashMap<UserId, User>>,
    daily_counters: Arc<DashMap<(UserId, u64), DailyCounter>>,
    accrual_log: Arc<DashMap<EventId, AccrualRecord>>,
    accrual_order: Arc<RwLock<Vec<EventId>>>,
    referral_edges: Arc<DashMap<UserId, ReferralEdge>>, // keyed by referred_id (depth=1 unique)
    referral_by_referrer: Arc<DashMap<UserId, Vec<UserId>>>,
    network_snapshot: Arc<RwLock<NetworkSnapshot>>,
    cards: Arc<DashMap<u64, Card>>,
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        InMemoryStateStore {
            users: Arc::new(DashMap::new()),
            daily_counters: Arc::new(DashMap::new()),
            accrual_log: Arc::new(DashMap::new()),
            accrual_order: Arc::new(RwLock::new(Vec::new())),
            referral_edges: Arc::new(DashMap::new()),
            referral_by_referrer: Arc::new(DashMap::new()),
            network_snapshot: Arc::new(RwLock::new(NetworkSnapshot::default())),
            cards: Arc::new(DashMap::new()),
        }
    }
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryStateStore {
    fn get(&self, id: &UserId) -> Option<User> {
        self.users.get(id).map(|r| r.clone())
    }

    fn get_or_create(&self, id: &UserId, now: TimestampSeconds) -> User {
        self.users
            .entry(*id)
            .or_insert_with(|| User::new(*id, now))
            .clone()
    }

    fn put(&self, user: User) {
        self.users.insert(user.id, user);
    }

    fn total_count(&self) -> u64 {
        self.users.len() as u64
    }

    fn active_count(&self, since: TimestampSeconds) -> u64 {
        self.users.iter().filter(|r| r.last_active_at >= since).count() as u64
    }
}

impl DailyCounterStore for InMemoryStateStore {
    fn get(&self, user_id: &UserId, date: u64) -> DailyCounter {
        self.daily_counters
            .get(&(*user_id, date))
            .map(|r| r.clone())
            .unwrap_or_else(|| DailyCounter {
                user_id_hex: user_id.to_hex(),
                date,
                ..Default::default()
            })
    }

    fn put(&self, user_id: &UserId, counter: DailyCounter) {
        self.daily_counters.insert((*user_id, counter.date), counter);
        let _ = user_id;
    }
}

impl AccrualLog for InMemoryStateStore {
    fn insert_if_absent(&self, record: AccrualRecord) -> Option<AccrualRecord> {
        if let Some(existing) = self.accrual_log.get(&record.event_id) {
            return Some(existing.clone());
        }
        let event_id = record.event_id;
        self.accrual_log.insert(event_id, record);
        self.accrual_order
            .write()
            .expect("accrual order lock poisoned")
            .push(event_id);
        None
    }

    fn get(&self, event_id: &EventId) -> Option<AccrualRecord> {
        self.accrual_log.get(event_id).map(|r| r.clone())
    }

    fn all_ordered(&self) -> Vec<AccrualRecord> {
        let order = self.accrual_order.read().expect("accrual order lock poisoned");
        order
            .iter()
            .filter_map(|id| self.accrual_log.get(id).map(|r| r.clone()))
            .collect()
    }
}

impl ReferralStore for InMemoryStateStore {
    fn insert(&self, edge: ReferralEdge) -> bool {
        use super::types::EdgeDepth;

        if edge.depth == EdgeDepth::L1 {
            if self.referral_edges.contains_key(&edge.referred_id) {
                return false; // depth=1 unique per referred user
            }
            // Cycle check: the referrer must not be a descendant of
            // referred_id (walking up from referrer must never reach
            // referred_id).
            let mut cursor = Some(edge.referrer_id);
            let mut hops = 0u8;
            while let Some(u) = cursor {
                if u == edge.referred_id {
                    return false;
                }
                cursor = self.referral_edges.get(&u).map(|e| e.referrer_id);
                hops += 1;
                if hops > 64 {
                    return false; // defensive bound, should be unreachable
                }
            }
            self.referral_by_referrer
                .entry(edge.referrer_id)
                .or_default()
                .push(edge.referred_id);
            self.referral_edges.insert(edge.referred_id, edge);
        }
        true
    }

    fn direct_referrer(&self, user_id: &UserId) -> Option<UserId> {
        self.referral_edges.get(user_id).map(|e| e.referrer_id)
    }

    fn direct_referrals(&self, referrer_id: &UserId) -> Vec<UserId> {
        self.referral_by_referrer
            .get(referrer_id)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    fn ancestors(&self, user_id: &UserId) -> Vec<(UserId, u8)> {
        let mut out = Vec::new();
        let mut cursor = self.direct_referrer(user_id);
        let mut depth = 1u8;
        while let Some(ancestor) = cursor {
            if depth > 3 {
                break;
            }
            out.push((ancestor, depth));
            cursor = self.direct_referrer(&ancestor);
            depth += 1;
        }
        out
    }
}

impl NetworkSnapshotCache for InMemoryStateStore {
    fn get(&self) -> NetworkSnapshot {
        self.network_snapshot
            .read()
            .expect("network snapshot lock poisoned")
            .clone()
    }

    fn set(&self, snapshot: NetworkSnapshot) {
        *self
            .network_snapshot
            .write()
            .expect("network snapshot lock poisoned") = snapshot;
    }
}

impl CardStore for InMemoryStateStore {
    fn active_cards_for(&self, owner_id: &UserId, now: TimestampSeconds) -> Vec<Card> {
        self.cards
            .iter()
            .filter(|entry| entry.owner_id == *owner_id && entry.is_active(now))
            .map(|entry| entry.clone())
            .collect()
    }

    fn put(&self, card: Card) {
        self.cards.insert(card.id, card);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::EdgeDepth;

    #[test]
    fn referral_insert_rejects_cycle() {
        let store = InMemoryStateStore::new();
        let a = UserId::from_bytes_lossy(b"a");
        let b = UserId::from_bytes_lossy(b"b");

        assert!(store.insert(ReferralEdge {
            referrer_id: a,
            referred_id: b,
            depth: EdgeDepth::L1,
            created_at: 0,
            active: true,
        }));

        // b -> a would close a cycle (a already refers b)
        assert!(!store.insert(ReferralEdge {
            referrer_id: b,
            referred_id: a,
            depth: EdgeDepth::L1,
            created_at: 0,
            active: true,
        }));
    }

    #[test]
    fn referral_insert_rejects_second_l1_parent() {
        let store = InMemoryStateStore::new();
        let a = UserId::from_bytes_lossy(b"a");
        let b = UserId::from_bytes_lossy(b"b");
        let c = UserId::from_bytes_lossy(b"c");

        assert!(store.insert(ReferralEdge {
            referrer_id: a,
            referred_id: c,
            depth: EdgeDepth::L1,
            created_at: 0,
            active: true,
        }));
        assert!(!store.insert(ReferralEdge {
            referrer_id: b,
            referred_id: c,
            depth: EdgeDepth::L1,
            created_at: 0,
            active: true,
        }));
    }

    #[test]
    fn ancestors_walk_up_to_three_levels() {
        let store = InMemoryStateStore::new();
        let a = UserId::from_bytes_lossy(b"a");
        let b = UserId::from_bytes_lossy(b"b");
        let c = UserId::from_bytes_lossy(b"c");
        let d = UserId::from_bytes_lossy(b"d");

        store.insert(ReferralEdge { referrer_id: a, referred_id: b, depth: EdgeDepth::L1, created_at: 0, active: true });
        store.insert(ReferralEdge { referrer_id: b, referred_id: c, depth: EdgeDepth::L1, created_at: 0, active: true });
        store.insert(ReferralEdge { referrer_id: c, referred_id: d, depth: EdgeDepth::L1, created_at: 0, active: true });

        let ancestors = store.ancestors(&d);
        assert_eq!(ancestors, vec![(c, 1), (b, 2), (a, 3)]);
    }

    #[test]
    fn accrual_log_is_idempotent() {
        let store = InMemoryStateStore::new();
        let event_id = EventId::from_bytes_lossy(b"e1");
        let record = AccrualRecord {
            event_id,
            user_id: UserId::zero(),
            fin_delta: 1.0,
            xp_delta: 10,
            rp_delta: 0,
            applied_multipliers: serde_json::json!({}),
            created_at: 0,
        };
        assert!(store.insert_if_absent(record.clone()).is_none());
        let replay = store.insert_if_absent(record.clone());
        assert_eq!(replay, Some(record));
        assert_eq!(store.all_ordered().len(), 1);
    }
}
