//! Score persistence
//!
//! Scores are append-only: rows are inserted once and never updated. A
//! unique index on (judge, participant, round) rejects a second score for
//! the same judge and round, which closes the race between a late judge
//! submission and deadline reconciliation.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::{DraftKey, Ratings, Score};
use sqlx::{Row, SqlitePool};
use tracing::{debug, error};

/// Durable record of submitted scores
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Append a score under a fresh id.
    ///
    /// Returns `EngineError::DuplicateScore` when the key already has a score.
    async fn record_score(
        &self,
        key: &DraftKey,
        ratings: Ratings,
        submitted_at: i64,
    ) -> Result<Score, EngineError>;

    /// All scores, most recent `submitted_at` first
    async fn list_scores(&self) -> Result<Vec<Score>, EngineError>;

    async fn has_score(&self, key: &DraftKey) -> Result<bool, EngineError>;
}

/// SQLite-backed score store
#[derive(Clone)]
pub struct ScoreRepository {
    pool: SqlitePool,
}

impl ScoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent scores, capped at `limit`
    pub async fn recent_scores(&self, limit: i64) -> Result<Vec<Score>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, judge_id, participant_id, creativity, execution, usability, round_index, submitted_at
             FROM scores ORDER BY submitted_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(rows.iter().map(score_from_row).collect())
    }

    /// Scores recorded for one round, oldest first
    pub async fn scores_for_round(
        &self,
        participant_id: &str,
        round_index: i64,
    ) -> Result<Vec<Score>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, judge_id, participant_id, creativity, execution, usability, round_index, submitted_at
             FROM scores WHERE participant_id = ? AND round_index = ?
             ORDER BY submitted_at ASC, rowid ASC",
        )
        .bind(participant_id)
        .bind(round_index)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(rows.iter().map(score_from_row).collect())
    }
}

#[async_trait]
impl ScoreStore for ScoreRepository {
    async fn record_score(
        &self,
        key: &DraftKey,
        ratings: Ratings,
        submitted_at: i64,
    ) -> Result<Score, EngineError> {
        let id = uuid::Uuid::new_v4().to_string();

        let result = sqlx::query(
            "INSERT INTO scores (id, judge_id, participant_id, creativity, execution, usability, round_index, submitted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&key.judge_id)
        .bind(&key.participant_id)
        .bind(i64::from(ratings.creativity))
        .bind(i64::from(ratings.execution))
        .bind(i64::from(ratings.usability))
        .bind(key.round_index)
        .bind(submitted_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(score_id = %id, judge_id = %key.judge_id, "Score recorded");
                Ok(Score {
                    id,
                    judge_id: key.judge_id.clone(),
                    participant_id: key.participant_id.clone(),
                    creativity: ratings.creativity,
                    execution: ratings.execution,
                    usability: ratings.usability,
                    round_index: key.round_index,
                    submitted_at,
                })
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(EngineError::DuplicateScore {
                    judge_id: key.judge_id.clone(),
                    participant_id: key.participant_id.clone(),
                    round_index: key.round_index,
                })
            }
            Err(e) => Err(database_error(e)),
        }
    }

    async fn list_scores(&self) -> Result<Vec<Score>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, judge_id, participant_id, creativity, execution, usability, round_index, submitted_at
             FROM scores ORDER BY submitted_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(rows.iter().map(score_from_row).collect())
    }

    async fn has_score(&self, key: &DraftKey) -> Result<bool, EngineError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scores WHERE judge_id = ? AND participant_id = ? AND round_index = ?",
        )
        .bind(&key.judge_id)
        .bind(&key.participant_id)
        .bind(key.round_index)
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(count > 0)
    }
}

fn score_from_row(r: &sqlx::sqlite::SqliteRow) -> Score {
    Score {
        id: r.get("id"),
        judge_id: r.get("judge_id"),
        participant_id: r.get("participant_id"),
        creativity: r.get::<i64, _>("creativity") as u8,
        execution: r.get::<i64, _>("execution") as u8,
        usability: r.get::<i64, _>("usability") as u8,
        round_index: r.get("round_index"),
        submitted_at: r.get("submitted_at"),
    }
}

pub(crate) fn database_error(e: sqlx::Error) -> EngineError {
    error!("Database operation failed: {}", e);
    EngineError::Database(e.to_string())
}
