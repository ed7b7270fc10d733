//! Inbound event relay
//!
//! Applies the events a judge or director client sends over its WebSocket:
//! channel membership, draft updates and final submissions. Drafts are a
//! best-effort stream: bad ones and ones outside the live round are dropped
//! silently. A rejected submission is answered with an `error` event to the
//! sender only.

use sdk::errors::{EngineError, GavelErrorExt};
use sdk::protocol::{ClientEvent, ErrorNotice, IdentifyPayload, ScorePayload, ServerEvent};
use sdk::types::Score;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{Roster, ScoreStore};
use crate::drafts::DraftCache;
use crate::hub::{BroadcastHub, ConnectionId, Target};
use crate::scheduler::now_millis;

/// Per-process relay shared by every connection handler
#[derive(Clone)]
pub struct SessionRelay {
    hub: Arc<BroadcastHub>,
    drafts: DraftCache,
    scores: Arc<dyn ScoreStore>,
    roster: Arc<dyn Roster>,
}

impl SessionRelay {
    pub fn new(
        hub: Arc<BroadcastHub>,
        drafts: DraftCache,
        scores: Arc<dyn ScoreStore>,
        roster: Arc<dyn Roster>,
    ) -> Self {
        Self {
            hub,
            drafts,
            scores,
            roster,
        }
    }

    /// Handle one raw text frame. Malformed frames are ignored.
    pub async fn handle_frame(&self, conn: ConnectionId, text: &str) {
        match ClientEvent::parse(text) {
            Some(event) => self.handle_event(conn, event).await,
            None => debug!(connection = conn, "Ignoring malformed frame"),
        }
    }

    pub async fn handle_event(&self, conn: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::Identify(payload) => self.identify(conn, payload).await,
            ClientEvent::JoinDirectors => {
                self.hub.join_directors(conn);
                info!(connection = conn, "Director console joined");
            }
            ClientEvent::SliderChange(payload) => self.slider_change(conn, &payload),
            ClientEvent::SubmitScore(payload) => {
                if let Err(e) = self.submit_score(&payload).await {
                    self.reject(conn, "submitScore", &e);
                }
            }
        }
    }

    /// Join the user's personal channel and every track they judge
    async fn identify(&self, conn: ConnectionId, payload: IdentifyPayload) {
        let Some(user_id) = payload.user_id.filter(|id| !id.trim().is_empty()) else {
            debug!(connection = conn, "Identify without user id dropped");
            return;
        };

        self.hub.subscribe(conn, &user_id);

        match self.roster.tracks_for_user(&user_id).await {
            Ok(tracks) => {
                for track in &tracks {
                    self.hub.join_track(conn, track);
                }
                info!(connection = conn, user_id = %user_id, ?tracks, "Connection identified");
            }
            Err(e) => warn!(user_id = %user_id, "Could not load tracks for user: {}", e),
        }
    }

    fn slider_change(&self, conn: ConnectionId, payload: &ScorePayload) {
        let key = match payload.key() {
            Ok(key) => key,
            Err(e) => {
                debug!(connection = conn, "Draft dropped: {}", e);
                return;
            }
        };

        let raw = match payload.raw_ratings() {
            Ok(raw) => raw,
            Err(e) => {
                debug!(connection = conn, "Draft dropped: {}", e);
                return;
            }
        };

        if let Err(e) = raw.validate() {
            warn!(connection = conn, judge_id = %key.judge_id, "Draft dropped: {}", e);
            return;
        }

        if self.drafts.put_live_draft(key, raw).is_none() {
            debug!(connection = conn, "Draft dropped: no live round for its key");
        }
    }

    /// Validate and persist a final submission, then announce it to directors.
    ///
    /// A submission without a complete identity is dropped and yields
    /// `Ok(None)`; every other failure is returned to the caller.
    pub async fn submit_score(&self, payload: &ScorePayload) -> Result<Option<Score>, EngineError> {
        let key = match payload.key() {
            Ok(key) => key,
            Err(e) => {
                debug!("Submission dropped: {}", e);
                return Ok(None);
            }
        };

        let ratings = payload.raw_ratings()?.validate()?;
        let score = self
            .scores
            .record_score(&key, ratings, now_millis())
            .await?;

        info!(
            judge_id = %score.judge_id,
            participant_id = %score.participant_id,
            round_index = score.round_index,
            "Score submitted"
        );

        self.hub
            .publish(ServerEvent::ScoreSubmitted(score.clone()), Target::Directors);

        Ok(Some(score))
    }

    fn reject(&self, conn: ConnectionId, rejected: &str, error: &EngineError) {
        warn!(connection = conn, rejected, "Client event rejected: {}", error);

        // Storage failures stay in the server log
        let message = if error.is_recoverable() {
            error.to_string()
        } else {
            error.user_hint().to_string()
        };

        self.hub.send_to(
            conn,
            ServerEvent::Error(ErrorNotice {
                rejected: rejected.to_string(),
                message,
                hint: error.user_hint().to_string(),
            }),
        );
    }
}
