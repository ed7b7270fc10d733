//! Judging domain types shared by the engine and its clients

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// Lowest accepted rating value
pub const MIN_RATING: i64 = 1;

/// Highest accepted rating value
pub const MAX_RATING: i64 = 10;

/// The three rated criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingField {
    Creativity,
    Execution,
    Usability,
}

impl RatingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingField::Creativity => "creativity",
            RatingField::Execution => "execution",
            RatingField::Usability => "usability",
        }
    }
}

impl fmt::Display for RatingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated set of ratings, each in `MIN_RATING..=MAX_RATING`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    pub creativity: u8,
    pub execution: u8,
    pub usability: u8,
}

impl Ratings {
    /// Score recorded for a judge who never interacted with a round
    pub const MINIMUM: Ratings = Ratings {
        creativity: 1,
        execution: 1,
        usability: 1,
    };

    /// Validate raw client values. Out-of-range values are rejected, never clamped.
    pub fn new(creativity: i64, execution: i64, usability: i64) -> Result<Self, EngineError> {
        Ok(Self {
            creativity: check(RatingField::Creativity, creativity)?,
            execution: check(RatingField::Execution, execution)?,
            usability: check(RatingField::Usability, usability)?,
        })
    }

    /// Build ratings by clamping each value into range.
    ///
    /// Only used when promoting a stored draft at the deadline; client input
    /// goes through [`Ratings::new`].
    pub fn clamped(creativity: i64, execution: i64, usability: i64) -> Self {
        let clamp = |v: i64| v.clamp(MIN_RATING, MAX_RATING) as u8;
        Self {
            creativity: clamp(creativity),
            execution: clamp(execution),
            usability: clamp(usability),
        }
    }
}

fn check(field: RatingField, value: i64) -> Result<u8, EngineError> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(value as u8)
    } else {
        Err(EngineError::RatingOutOfRange { field, value })
    }
}

/// Structurally complete but unvalidated ratings, as held by the draft cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRatings {
    pub creativity: i64,
    pub execution: i64,
    pub usability: i64,
}

impl RawRatings {
    pub fn validate(&self) -> Result<Ratings, EngineError> {
        Ratings::new(self.creativity, self.execution, self.usability)
    }

    pub fn clamp(&self) -> Ratings {
        Ratings::clamped(self.creativity, self.execution, self.usability)
    }
}

impl From<Ratings> for RawRatings {
    fn from(r: Ratings) -> Self {
        Self {
            creativity: r.creativity.into(),
            execution: r.execution.into(),
            usability: r.usability.into(),
        }
    }
}

/// Identity of one presentation slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundId {
    pub participant_id: String,
    pub round_index: i64,
}

/// Composite key for drafts and for the one-score-per-judge rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftKey {
    pub judge_id: String,
    pub participant_id: String,
    pub round_index: i64,
}

impl DraftKey {
    pub fn new(
        judge_id: impl Into<String>,
        participant_id: impl Into<String>,
        round_index: i64,
    ) -> Self {
        Self {
            judge_id: judge_id.into(),
            participant_id: participant_id.into(),
            round_index,
        }
    }

    pub fn round(&self) -> RoundId {
        RoundId {
            participant_id: self.participant_id.clone(),
            round_index: self.round_index,
        }
    }
}

/// An active presentation
///
/// Serialized as the `presentParticipant` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub participant_id: String,
    pub round_index: i64,
    #[serde(rename = "trackLabel", skip_serializing_if = "Option::is_none", default)]
    pub track: Option<String>,
    /// Unix epoch milliseconds
    pub start_time: i64,
    /// Milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}

impl Round {
    pub fn id(&self) -> RoundId {
        RoundId {
            participant_id: self.participant_id.clone(),
            round_index: self.round_index,
        }
    }

    pub fn deadline(&self) -> i64 {
        self.start_time + self.duration_ms as i64
    }
}

/// A recorded score. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub id: String,
    pub judge_id: String,
    pub participant_id: String,
    pub creativity: u8,
    pub execution: u8,
    pub usability: u8,
    pub round_index: i64,
    /// Unix epoch milliseconds
    pub submitted_at: i64,
}

impl Score {
    pub fn ratings(&self) -> Ratings {
        Ratings {
            creativity: self.creativity,
            execution: self.execution,
            usability: self.usability,
        }
    }

    pub fn key(&self) -> DraftKey {
        DraftKey::new(&self.judge_id, &self.participant_id, self.round_index)
    }
}

/// Roster role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Judge,
    Director,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Judge => "JUDGE",
            Role::Director => "DIRECTOR",
        }
    }
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "JUDGE" => Ok(Role::Judge),
            "DIRECTOR" => Ok(Role::Director),
            other => Err(EngineError::Validation(format!("unknown role '{}'", other))),
        }
    }
}
