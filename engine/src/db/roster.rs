//! Roster tables: users, participants and judge assignments
//!
//! The judging core only needs to know which judges belong to a track and
//! which tracks a user follows; that view is the `Roster` trait. The
//! repository also offers the minimal create/list operations the control
//! surface exposes so a session can be set up without extra tooling.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::Role;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::scores::database_error;

/// Track membership as seen by the scheduler and the broadcast hub
#[async_trait]
pub trait Roster: Send + Sync {
    /// Judges assigned to `track`; every known judge when `track` is `None`
    async fn judges_for_track(&self, track: Option<&str>) -> Result<Vec<String>, EngineError>;

    /// Track labels a user is assigned to
    async fn tracks_for_user(&self, user_id: &str) -> Result<Vec<String>, EngineError>;

    /// Track label of a participant, if it has one
    async fn participant_track(&self, participant_id: &str)
        -> Result<Option<String>, EngineError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub judge_id: String,
    pub participant_id: Option<String>,
    pub role_label: Option<String>,
}

/// SQLite-backed roster
#[derive(Clone)]
pub struct RosterRepository {
    pool: SqlitePool,
}

impl RosterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a user under a freshly issued id
    pub async fn create_user(&self, name: &str, role: Role) -> Result<User, EngineError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO users (id, name, role) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(User {
            id,
            name: name.to_string(),
            role,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<User>, EngineError> {
        let rows = sqlx::query("SELECT id, name, role FROM users ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;

        rows.iter()
            .map(|r| {
                let role: String = r.get("role");
                Ok(User {
                    id: r.get("id"),
                    name: r.get("name"),
                    role: role.parse()?,
                })
            })
            .collect()
    }

    pub async fn create_participant(
        &self,
        name: &str,
        label: Option<&str>,
    ) -> Result<Participant, EngineError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO participants (id, name, label) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(label)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(Participant {
            id,
            name: name.to_string(),
            label: label.map(String::from),
        })
    }

    pub async fn list_participants(&self) -> Result<Vec<Participant>, EngineError> {
        let rows = sqlx::query("SELECT id, name, label FROM participants ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(rows
            .iter()
            .map(|r| Participant {
                id: r.get("id"),
                name: r.get("name"),
                label: r.get("label"),
            })
            .collect())
    }

    /// Assign a judge to a participant and/or a track label
    pub async fn assign(
        &self,
        judge_id: &str,
        participant_id: Option<&str>,
        role_label: Option<&str>,
    ) -> Result<Assignment, EngineError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO assignments (id, judge_id, participant_id, role_label) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(judge_id)
        .bind(participant_id)
        .bind(role_label)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(Assignment {
            id,
            judge_id: judge_id.to_string(),
            participant_id: participant_id.map(String::from),
            role_label: role_label.map(String::from),
        })
    }

    pub async fn list_assignments(&self) -> Result<Vec<Assignment>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, judge_id, participant_id, role_label FROM assignments ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(rows
            .iter()
            .map(|r| Assignment {
                id: r.get("id"),
                judge_id: r.get("judge_id"),
                participant_id: r.get("participant_id"),
                role_label: r.get("role_label"),
            })
            .collect())
    }
}

#[async_trait]
impl Roster for RosterRepository {
    async fn judges_for_track(&self, track: Option<&str>) -> Result<Vec<String>, EngineError> {
        let ids: Result<Vec<String>, sqlx::Error> = match track {
            Some(track) => sqlx::query_scalar(
                "SELECT DISTINCT u.id FROM users u
                 JOIN assignments a ON a.judge_id = u.id
                 WHERE u.role = 'JUDGE' AND a.role_label = ?
                 ORDER BY u.rowid",
            )
            .bind(track)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_scalar("SELECT id FROM users WHERE role = 'JUDGE' ORDER BY rowid")
                .fetch_all(&self.pool)
                .await,
        };

        ids.map_err(database_error)
    }

    async fn tracks_for_user(&self, user_id: &str) -> Result<Vec<String>, EngineError> {
        sqlx::query_scalar(
            "SELECT DISTINCT role_label FROM assignments
             WHERE judge_id = ? AND role_label IS NOT NULL
             ORDER BY role_label",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)
    }

    async fn participant_track(
        &self,
        participant_id: &str,
    ) -> Result<Option<String>, EngineError> {
        let label: Option<Option<String>> =
            sqlx::query_scalar("SELECT label FROM participants WHERE id = ?")
                .bind(participant_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;

        Ok(label.flatten().filter(|l| !l.is_empty()))
    }
}
