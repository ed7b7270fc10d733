//! REST handlers for director controls and the roster

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sdk::errors::{EngineError, GavelErrorExt};
use sdk::protocol::{AssignmentChanged, ServerEvent};
use sdk::types::{Role, Score};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use super::AppState;
use crate::db::{Assignment, Participant, ScoreStore, User};
use crate::hub::Target;
use crate::scheduler::{CurrentRound, StartRequest};

/// `EngineError` rendered as a JSON error response
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::DuplicateScore { .. } => StatusCode::CONFLICT,
            e if !e.is_recoverable() => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Network(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        let hint = self.0.user_hint();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            hint.to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message, "hint": hint }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBody {
    participant_id: Option<String>,
    #[serde(alias = "index")]
    round_index: Option<i64>,
    /// Milliseconds
    duration: Option<i64>,
    #[serde(alias = "trackLabel")]
    track: Option<String>,
}

pub async fn start_handler(
    State(state): State<AppState>,
    Json(body): Json<StartBody>,
) -> ApiResult<Value> {
    let duration = match body.duration {
        Some(ms) if ms <= 0 => return Err(EngineError::InvalidDuration(ms).into()),
        Some(ms) => Some(Duration::from_millis(ms as u64)),
        None => None,
    };

    let round = state
        .scheduler
        .start_presentation(StartRequest {
            participant_id: body.participant_id.unwrap_or_default(),
            round_index: body.round_index,
            duration,
            track: body.track,
        })
        .await?;

    Ok(Json(json!({ "ok": true, "round": round })))
}

pub async fn advance_handler(State(state): State<AppState>) -> ApiResult<Value> {
    let ended = state.scheduler.advance().await?;
    Ok(Json(json!({ "ok": true, "ended": ended })))
}

pub async fn current_handler(State(state): State<AppState>) -> Json<Option<CurrentRound>> {
    Json(state.scheduler.current().await)
}

pub async fn scores_handler(State(state): State<AppState>) -> ApiResult<Vec<Score>> {
    Ok(Json(state.scores.list_scores().await?))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    name: Option<String>,
    role: Option<String>,
}

/// Register a user. The issued id doubles as the client's identity.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> ApiResult<User> {
    let name = required(body.name, "name")?;
    let role: Role = required(body.role, "role")?.parse()?;

    let user = state.roster.create_user(&name, role).await?;
    info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    Ok(Json(user))
}

pub async fn users_handler(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    Ok(Json(state.roster.list_users().await?))
}

pub async fn participants_handler(State(state): State<AppState>) -> ApiResult<Vec<Participant>> {
    Ok(Json(state.roster.list_participants().await?))
}

#[derive(Debug, Deserialize)]
pub struct ParticipantBody {
    name: Option<String>,
    label: Option<String>,
}

pub async fn create_participant_handler(
    State(state): State<AppState>,
    Json(body): Json<ParticipantBody>,
) -> ApiResult<Participant> {
    let name = required(body.name, "name")?;
    let label = body.label.filter(|l| !l.trim().is_empty());

    let participant = state
        .roster
        .create_participant(&name, label.as_deref())
        .await?;
    Ok(Json(participant))
}

pub async fn assignments_handler(State(state): State<AppState>) -> ApiResult<Vec<Assignment>> {
    Ok(Json(state.roster.list_assignments().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    judge_id: Option<String>,
    participant_id: Option<String>,
    role_label: Option<String>,
}

/// Record an assignment and notify the judge's personal channel
pub async fn assign_handler(
    State(state): State<AppState>,
    Json(body): Json<AssignBody>,
) -> ApiResult<Assignment> {
    let judge_id = required(body.judge_id, "judgeId")?;

    let assignment = state
        .roster
        .assign(
            &judge_id,
            body.participant_id.as_deref(),
            body.role_label.as_deref(),
        )
        .await?;

    state.hub.publish(
        ServerEvent::AssignmentChanged(AssignmentChanged {
            judge_id: assignment.judge_id.clone(),
            participant_id: assignment.participant_id.clone(),
            role_label: assignment.role_label.clone(),
        }),
        Target::User(judge_id),
    );

    Ok(Json(assignment))
}

fn required(value: Option<String>, field: &'static str) -> Result<String, EngineError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(EngineError::MissingField(field))
}
