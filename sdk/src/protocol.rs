//! Realtime wire protocol
//!
//! Every WebSocket text frame carries one JSON object of the form
//! `{"event": "<name>", "data": {...}}`. Event names are camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EngineError;
use crate::types::{DraftKey, RatingField, RawRatings, Round, RoundId, Score};

/// Events pushed by judge and director clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Associate the connection with a user id
    Identify(IdentifyPayload),
    /// Subscribe the connection to the directors channel
    JoinDirectors,
    /// Draft update while a round is running
    SliderChange(ScorePayload),
    /// Final score submission
    SubmitScore(ScorePayload),
}

impl ClientEvent {
    /// Parse a text frame. `None` for anything malformed.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyPayload {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Payload shared by `sliderChange` and `submitScore`
///
/// All fields are optional on the wire so that missing values can be
/// reported per field instead of failing the whole frame. Ratings are kept
/// as raw JSON until [`ScorePayload::raw_ratings`] so a wrongly typed value
/// is a validation error rather than an unparseable frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePayload {
    #[serde(default)]
    pub judge_id: Option<String>,
    #[serde(default)]
    pub participant_id: Option<String>,
    #[serde(default, alias = "index")]
    pub round_index: Option<i64>,
    #[serde(default)]
    pub creativity: Option<Value>,
    #[serde(default)]
    pub execution: Option<Value>,
    #[serde(default)]
    pub usability: Option<Value>,
}

impl ScorePayload {
    /// The (judge, participant, round) identity. Empty strings count as missing.
    pub fn key(&self) -> Result<DraftKey, EngineError> {
        let judge_id = non_empty(&self.judge_id).ok_or(EngineError::MissingField("judgeId"))?;
        let participant_id =
            non_empty(&self.participant_id).ok_or(EngineError::MissingField("participantId"))?;
        let round_index = self
            .round_index
            .ok_or(EngineError::MissingField("roundIndex"))?;
        Ok(DraftKey::new(judge_id, participant_id, round_index))
    }

    /// The three ratings as whole numbers, not yet range checked
    pub fn raw_ratings(&self) -> Result<RawRatings, EngineError> {
        Ok(RawRatings {
            creativity: whole_number(RatingField::Creativity, &self.creativity)?,
            execution: whole_number(RatingField::Execution, &self.execution)?,
            usability: whole_number(RatingField::Usability, &self.usability)?,
        })
    }
}

fn whole_number(field: RatingField, value: &Option<Value>) -> Result<i64, EngineError> {
    match value {
        None | Some(Value::Null) => Err(EngineError::MissingField(field.as_str())),
        Some(v) => v.as_i64().ok_or_else(|| {
            EngineError::Validation(format!("{} must be a whole number, got {}", field, v))
        }),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Events pushed by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    PresentParticipant(Round),
    AdvanceParticipant(RoundId),
    ScoreSubmitted(Score),
    AssignmentChanged(AssignmentChanged),
    /// Rejection of a client event, sent only to the originating connection
    Error(ErrorNotice),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::PresentParticipant(_) => "presentParticipant",
            ServerEvent::AdvanceParticipant(_) => "advanceParticipant",
            ServerEvent::ScoreSubmitted(_) => "scoreSubmitted",
            ServerEvent::AssignmentChanged(_) => "assignmentChanged",
            ServerEvent::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentChanged {
    pub judge_id: String,
    pub participant_id: Option<String>,
    pub role_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    /// Name of the client event that was rejected
    pub rejected: String,
    pub message: String,
    pub hint: String,
}
