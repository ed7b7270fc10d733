//! In-memory collaborators for unit tests
//!
//! Keeps scheduler and session tests free of SQLite I/O so they can run on a
//! paused tokio clock.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::protocol::ServerEvent;
use sdk::types::{DraftKey, Ratings, Score};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::db::{Roster, ScoreStore};

#[derive(Default)]
pub struct MemoryScoreStore {
    scores: Mutex<Vec<Score>>,
    next_id: Mutex<u64>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scores_for(&self, key: &DraftKey) -> Vec<Score> {
        self.scores
            .lock()
            .unwrap()
            .iter()
            .filter(|s| &s.key() == key)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scores.lock().unwrap().len()
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn record_score(
        &self,
        key: &DraftKey,
        ratings: Ratings,
        submitted_at: i64,
    ) -> Result<Score, EngineError> {
        let mut scores = self.scores.lock().unwrap();
        if scores.iter().any(|s| &s.key() == key) {
            return Err(EngineError::DuplicateScore {
                judge_id: key.judge_id.clone(),
                participant_id: key.participant_id.clone(),
                round_index: key.round_index,
            });
        }

        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;

        let score = Score {
            id: format!("score-{}", next_id),
            judge_id: key.judge_id.clone(),
            participant_id: key.participant_id.clone(),
            creativity: ratings.creativity,
            execution: ratings.execution,
            usability: ratings.usability,
            round_index: key.round_index,
            submitted_at,
        };
        scores.push(score.clone());
        Ok(score)
    }

    async fn list_scores(&self) -> Result<Vec<Score>, EngineError> {
        let mut scores = self.scores.lock().unwrap().clone();
        scores.reverse();
        Ok(scores)
    }

    async fn has_score(&self, key: &DraftKey) -> Result<bool, EngineError> {
        Ok(self.scores.lock().unwrap().iter().any(|s| &s.key() == key))
    }
}

/// Store double whose behaviour can be broken per judge
///
/// - a racing judge's submission lands between `has_score` and
///   `record_score`, so the insert reports `DuplicateScore`
/// - a judge with a failing lookup or write gets a `Database` error
#[derive(Default)]
pub struct FaultyScoreStore {
    inner: MemoryScoreStore,
    racing: Vec<String>,
    failing_lookup: Vec<String>,
    failing_write: Vec<String>,
}

impl FaultyScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn racing(mut self, judge_id: &str) -> Self {
        self.racing.push(judge_id.to_string());
        self
    }

    pub fn failing_lookup(mut self, judge_id: &str) -> Self {
        self.failing_lookup.push(judge_id.to_string());
        self
    }

    pub fn failing_write(mut self, judge_id: &str) -> Self {
        self.failing_write.push(judge_id.to_string());
        self
    }

    pub fn scores_for(&self, key: &DraftKey) -> Vec<Score> {
        self.inner.scores_for(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl ScoreStore for FaultyScoreStore {
    async fn record_score(
        &self,
        key: &DraftKey,
        ratings: Ratings,
        submitted_at: i64,
    ) -> Result<Score, EngineError> {
        if self.failing_write.contains(&key.judge_id) {
            return Err(EngineError::Database("disk I/O error".to_string()));
        }
        if self.racing.contains(&key.judge_id) {
            // The judge's own submission wins the race
            self.inner
                .record_score(key, Ratings::new(9, 9, 9)?, submitted_at)
                .await?;
        }
        self.inner.record_score(key, ratings, submitted_at).await
    }

    async fn list_scores(&self) -> Result<Vec<Score>, EngineError> {
        self.inner.list_scores().await
    }

    async fn has_score(&self, key: &DraftKey) -> Result<bool, EngineError> {
        if self.failing_lookup.contains(&key.judge_id) {
            return Err(EngineError::Database("database is locked".to_string()));
        }
        if self.racing.contains(&key.judge_id) {
            return Ok(false);
        }
        self.inner.has_score(key).await
    }
}

/// Fixed roster: judges with an optional track each, participants with an optional track
#[derive(Default)]
pub struct StaticRoster {
    judges: Vec<(String, Option<String>)>,
    participants: HashMap<String, String>,
}

impl StaticRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn judge(mut self, id: &str) -> Self {
        self.judges.push((id.to_string(), None));
        self
    }

    pub fn judge_on(mut self, id: &str, track: &str) -> Self {
        self.judges.push((id.to_string(), Some(track.to_string())));
        self
    }

    pub fn participant_on(mut self, id: &str, track: &str) -> Self {
        self.participants.insert(id.to_string(), track.to_string());
        self
    }
}

#[async_trait]
impl Roster for StaticRoster {
    async fn judges_for_track(&self, track: Option<&str>) -> Result<Vec<String>, EngineError> {
        Ok(self
            .judges
            .iter()
            .filter(|(_, t)| track.is_none() || t.as_deref() == track)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn tracks_for_user(&self, user_id: &str) -> Result<Vec<String>, EngineError> {
        Ok(self
            .judges
            .iter()
            .filter(|(id, _)| id == user_id)
            .filter_map(|(_, t)| t.clone())
            .collect())
    }

    async fn participant_track(
        &self,
        participant_id: &str,
    ) -> Result<Option<String>, EngineError> {
        Ok(self.participants.get(participant_id).cloned())
    }
}

/// Everything currently queued for a connection
pub fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn names(events: &[ServerEvent]) -> Vec<&'static str> {
    events.iter().map(ServerEvent::name).collect()
}
