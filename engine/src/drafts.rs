//! Draft cache
//!
//! Holds the latest unsubmitted slider values per (judge, participant, round)
//! so the scheduler can fall back to them when a round's deadline passes.
//! Entries are independent; a single lock keeps each key's writes ordered
//! and is never held across an await point.
//!
//! The cache also tracks which round is live. Client drafts go through
//! [`DraftCache::put_live_draft`], which only accepts keys of that round, so
//! the map never holds more than one draft per judge once a round is over.

use sdk::types::{DraftKey, RawRatings, RoundId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A judge's tentative rating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draft {
    pub ratings: RawRatings,
    /// Unix epoch milliseconds of the last write
    pub updated_at: i64,
}

/// In-memory draft store, cheap to clone and share between connections
#[derive(Clone, Default)]
pub struct DraftCache {
    state: Arc<Mutex<CacheState>>,
}

#[derive(Default)]
struct CacheState {
    drafts: HashMap<DraftKey, Draft>,
    live: Option<RoundId>,
}

impl DraftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the draft for `key`. Later writes always replace earlier ones.
    pub fn put_draft(&self, key: DraftKey, ratings: RawRatings) -> Draft {
        let draft = new_draft(ratings);
        self.lock().drafts.insert(key, draft);
        draft
    }

    /// Upsert a client draft, but only for the live round.
    ///
    /// Returns `None` and stores nothing when no round is live or `key`
    /// belongs to another round.
    pub fn put_live_draft(&self, key: DraftKey, ratings: RawRatings) -> Option<Draft> {
        let mut state = self.lock();
        let is_live = state
            .live
            .as_ref()
            .is_some_and(|round| in_round(&key, round));
        if !is_live {
            return None;
        }

        let draft = new_draft(ratings);
        state.drafts.insert(key, draft);
        Some(draft)
    }

    pub fn get_draft(&self, key: &DraftKey) -> Option<Draft> {
        self.lock().drafts.get(key).copied()
    }

    /// Mark `round` as live and discard every draft left from earlier rounds.
    /// Returns how many stale drafts were removed.
    pub fn open_round(&self, round: &RoundId) -> usize {
        let mut state = self.lock();
        let stale = state.drafts.len();
        state.drafts.clear();
        state.live = Some(round.clone());
        stale
    }

    /// The round client drafts are currently accepted for
    pub fn live_round(&self) -> Option<RoundId> {
        self.lock().live.clone()
    }

    /// Drop every draft belonging to a finished round and stop accepting
    /// new ones for it. Returns how many were removed.
    pub fn clear_round(&self, round: &RoundId) -> usize {
        let mut state = self.lock();
        if state.live.as_ref() == Some(round) {
            state.live = None;
        }
        let before = state.drafts.len();
        state.drafts.retain(|key, _| !in_round(key, round));
        before - state.drafts.len()
    }

    pub fn len(&self) -> usize {
        self.lock().drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().expect("DraftCache lock poisoned")
    }
}

fn new_draft(ratings: RawRatings) -> Draft {
    Draft {
        ratings,
        updated_at: chrono::Utc::now().timestamp_millis(),
    }
}

fn in_round(key: &DraftKey, round: &RoundId) -> bool {
    key.participant_id == round.participant_id && key.round_index == round.round_index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(c: i64, e: i64, u: i64) -> RawRatings {
        RawRatings {
            creativity: c,
            execution: e,
            usability: u,
        }
    }

    #[test]
    fn test_latest_write_wins() {
        let cache = DraftCache::new();
        let key = DraftKey::new("j1", "p1", 0);

        cache.put_draft(key.clone(), raw(3, 3, 3));
        cache.put_draft(key.clone(), raw(7, 8, 6));

        assert_eq!(cache.get_draft(&key).unwrap().ratings, raw(7, 8, 6));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let cache = DraftCache::new();
        cache.put_draft(DraftKey::new("j1", "p1", 0), raw(1, 2, 3));
        cache.put_draft(DraftKey::new("j1", "p1", 1), raw(4, 5, 6));
        cache.put_draft(DraftKey::new("j2", "p1", 0), raw(7, 8, 9));

        assert_eq!(
            cache.get_draft(&DraftKey::new("j1", "p1", 1)).unwrap().ratings,
            raw(4, 5, 6)
        );
        assert!(cache.get_draft(&DraftKey::new("j3", "p1", 0)).is_none());
    }

    #[test]
    fn test_clear_round_only_touches_that_round() {
        let cache = DraftCache::new();
        cache.put_draft(DraftKey::new("j1", "p1", 0), raw(1, 2, 3));
        cache.put_draft(DraftKey::new("j2", "p1", 0), raw(1, 2, 3));
        cache.put_draft(DraftKey::new("j1", "p2", 0), raw(1, 2, 3));

        let removed = cache.clear_round(&RoundId {
            participant_id: "p1".to_string(),
            round_index: 0,
        });

        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_draft(&DraftKey::new("j1", "p2", 0)).is_some());
    }

    #[test]
    fn test_live_drafts_need_an_open_round() {
        let cache = DraftCache::new();
        let key = DraftKey::new("j1", "p1", 0);
        let round = RoundId {
            participant_id: "p1".to_string(),
            round_index: 0,
        };

        assert!(cache.put_live_draft(key.clone(), raw(5, 5, 5)).is_none());
        assert!(cache.is_empty());

        cache.open_round(&round);
        assert!(cache.put_live_draft(key.clone(), raw(6, 6, 6)).is_some());
        assert!(cache
            .put_live_draft(DraftKey::new("j1", "ghost", 0), raw(6, 6, 6))
            .is_none());
        assert!(cache
            .put_live_draft(DraftKey::new("j1", "p1", 1), raw(6, 6, 6))
            .is_none());
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.clear_round(&round), 1);
        assert_eq!(cache.live_round(), None);
        assert!(cache.put_live_draft(key, raw(7, 7, 7)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_open_round_discards_stale_drafts() {
        let cache = DraftCache::new();
        cache.put_draft(DraftKey::new("j1", "p1", 0), raw(1, 2, 3));
        cache.put_draft(DraftKey::new("j2", "p9", 4), raw(1, 2, 3));

        let round = RoundId {
            participant_id: "p1".to_string(),
            round_index: 0,
        };
        assert_eq!(cache.open_round(&round), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.live_round(), Some(round));
    }

    #[test]
    fn test_clearing_another_round_keeps_the_live_one_open() {
        let cache = DraftCache::new();
        let live = RoundId {
            participant_id: "p2".to_string(),
            round_index: 0,
        };
        cache.open_round(&live);
        cache.clear_round(&RoundId {
            participant_id: "p1".to_string(),
            round_index: 0,
        });

        assert_eq!(cache.live_round(), Some(live));
    }

    #[test]
    fn test_concurrent_writers_keep_one_entry_per_key() {
        let cache = DraftCache::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for v in 1..=10 {
                        cache.put_draft(DraftKey::new(format!("j{}", i), "p1", 0), raw(v, v, v));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 8);
        for i in 0..8 {
            let draft = cache.get_draft(&DraftKey::new(format!("j{}", i), "p1", 0)).unwrap();
            assert_eq!(draft.ratings, raw(10, 10, 10));
        }
    }
}
