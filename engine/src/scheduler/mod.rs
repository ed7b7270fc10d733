//! Presentation scheduler
//!
//! Single authoritative state machine deciding who presents now. It has two
//! states, Idle and Presenting, and owns the deadline timer of the active
//! round. Every transition (start, advance, deadline) runs under one async
//! mutex, so a deadline racing an explicit advance or a new start can never
//! produce two terminal transitions for the same round.
//!
//! # Deadline timer
//!
//! Each armed timer captures the generation number of its round. When it
//! fires it takes the transition lock and compares that generation with the
//! active round; any mismatch is a no-op. Starting a new round or advancing
//! also aborts the pending timer task while holding the lock, so a cancelled
//! timer never reaches its reconciliation body.
//!
//! # Reconciliation
//!
//! When the deadline passes, every judge assigned to the round's track ends
//! up with exactly one score: an existing submission is kept, otherwise the
//! latest draft is promoted (clamped to range), otherwise the minimum score
//! (1, 1, 1) is recorded. Each new score is pushed to directors, then
//! `advanceParticipant` is published and the scheduler returns to Idle.

use sdk::errors::EngineError;
use sdk::protocol::ServerEvent;
use sdk::types::{DraftKey, Ratings, Round, RoundId};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::db::{Roster, ScoreStore};
use crate::drafts::DraftCache;
use crate::hub::{BroadcastHub, Target};

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Round length when the director does not pass one
    pub default_duration: Duration,
    /// Scope rounds to the participant's track
    pub filter_by_track: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_duration: Duration::from_secs(180),
            filter_by_track: true,
        }
    }
}

/// Director request to put a participant on stage
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub participant_id: String,
    pub round_index: Option<i64>,
    pub duration: Option<Duration>,
    /// Explicit track; looked up from the roster when absent
    pub track: Option<String>,
}

impl StartRequest {
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            ..Default::default()
        }
    }

    pub fn round_index(mut self, round_index: i64) -> Self {
        self.round_index = Some(round_index);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn track(mut self, track: impl Into<String>) -> Self {
        self.track = Some(track.into());
        self
    }
}

/// Snapshot of the active round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentRound {
    #[serde(flatten)]
    pub round: Round,
    pub remaining_ms: u64,
}

/// Outcome counts of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Judges that had already submitted
    pub kept: usize,
    /// Drafts promoted to scores
    pub promoted: usize,
    /// Minimum scores inserted for judges without a draft
    pub defaulted: usize,
    /// Writes that failed in the store
    pub failed: usize,
}

struct ActiveRound {
    round: Round,
    generation: u64,
    deadline: Instant,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct SchedulerState {
    active: Option<ActiveRound>,
    generation: u64,
}

struct Inner {
    state: Mutex<SchedulerState>,
    hub: Arc<BroadcastHub>,
    drafts: DraftCache,
    scores: Arc<dyn ScoreStore>,
    roster: Arc<dyn Roster>,
    settings: SchedulerSettings,
}

/// Handle to the presentation state machine. Clones share the same state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        hub: Arc<BroadcastHub>,
        drafts: DraftCache,
        scores: Arc<dyn ScoreStore>,
        roster: Arc<dyn Roster>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedulerState::default()),
                hub,
                drafts,
                scores,
                roster,
                settings,
            }),
        }
    }

    /// Start a presentation, superseding any active round
    ///
    /// The previous round's timer is aborted before the new one is armed.
    /// A superseded round is not reconciled.
    pub async fn start_presentation(&self, request: StartRequest) -> Result<Round, EngineError> {
        let participant_id = request.participant_id.trim().to_string();
        if participant_id.is_empty() {
            return Err(EngineError::MissingParticipant);
        }

        let duration = request
            .duration
            .unwrap_or(self.inner.settings.default_duration);
        if duration.is_zero() {
            return Err(EngineError::InvalidDuration(0));
        }

        // Roster lookup happens before the transition lock is taken
        let track = if self.inner.settings.filter_by_track {
            match request.track.filter(|t| !t.trim().is_empty()) {
                Some(track) => Some(track),
                None => self.inner.roster.participant_track(&participant_id).await?,
            }
        } else {
            None
        };

        let mut state = self.inner.state.lock().await;

        if let Some(previous) = state.active.take() {
            previous.timer.abort();
            info!(
                participant_id = %previous.round.participant_id,
                round_index = previous.round.round_index,
                "Superseding active round without reconciliation"
            );
        }

        state.generation += 1;
        let generation = state.generation;

        let round = Round {
            participant_id,
            round_index: request.round_index.unwrap_or(0),
            track,
            start_time: now_millis(),
            duration_ms: duration.as_millis() as u64,
        };

        let stale = self.inner.drafts.open_round(&round.id());
        if stale > 0 {
            debug!(stale, "Discarded drafts from earlier rounds");
        }

        let deadline = Instant::now() + duration;
        let timer = self.arm_deadline(deadline, generation);

        state.active = Some(ActiveRound {
            round: round.clone(),
            generation,
            deadline,
            timer,
        });

        info!(
            participant_id = %round.participant_id,
            round_index = round.round_index,
            track = ?round.track,
            duration_ms = round.duration_ms,
            "Presentation started"
        );

        self.inner.hub.publish(
            ServerEvent::PresentParticipant(round.clone()),
            target_for(&round),
        );

        Ok(round)
    }

    /// End the active round without reconciliation
    ///
    /// Returns the ended round, or `None` when already Idle.
    pub async fn advance(&self) -> Result<Option<RoundId>, EngineError> {
        let mut state = self.inner.state.lock().await;

        let Some(active) = state.active.take() else {
            debug!("Advance requested while idle");
            return Ok(None);
        };

        active.timer.abort();
        let id = active.round.id();
        self.inner.drafts.clear_round(&id);

        info!(
            participant_id = %id.participant_id,
            round_index = id.round_index,
            "Presentation advanced by director"
        );

        self.inner.hub.publish(
            ServerEvent::AdvanceParticipant(id.clone()),
            target_for(&active.round),
        );

        Ok(Some(id))
    }

    /// The active round, if any, with its remaining time
    pub async fn current(&self) -> Option<CurrentRound> {
        let state = self.inner.state.lock().await;
        state.active.as_ref().map(|active| CurrentRound {
            round: active.round.clone(),
            remaining_ms: active
                .deadline
                .saturating_duration_since(Instant::now())
                .as_millis() as u64,
        })
    }

    pub async fn is_presenting(&self) -> bool {
        self.inner.state.lock().await.active.is_some()
    }

    fn arm_deadline(&self, deadline: Instant, generation: u64) -> JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = inner.upgrade() {
                inner.on_deadline(generation).await;
            }
        })
    }
}

impl Inner {
    async fn on_deadline(&self, generation: u64) {
        let mut state = self.state.lock().await;

        let is_current = state
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation);
        if !is_current {
            debug!(generation, "Stale deadline ignored");
            return;
        }

        // The timer handle belongs to this very task, so it is dropped, not aborted
        let Some(active) = state.active.take() else {
            return;
        };
        let round = active.round;

        info!(
            participant_id = %round.participant_id,
            round_index = round.round_index,
            "Deadline reached, reconciling scores"
        );

        let report = self.reconcile(&round).await;

        info!(
            participant_id = %round.participant_id,
            round_index = round.round_index,
            kept = report.kept,
            promoted = report.promoted,
            defaulted = report.defaulted,
            failed = report.failed,
            "Reconciliation finished"
        );

        self.drafts.clear_round(&round.id());
        self.hub
            .publish(ServerEvent::AdvanceParticipant(round.id()), target_for(&round));
    }

    /// Give every assigned judge exactly one score for `round`.
    /// Runs with the transition lock held.
    async fn reconcile(&self, round: &Round) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let judges = match self.roster.judges_for_track(round.track.as_deref()).await {
            Ok(judges) => judges,
            Err(e) => {
                error!("Cannot load judges for reconciliation: {}", e);
                return report;
            }
        };

        for judge_id in judges {
            let key = DraftKey::new(judge_id, &round.participant_id, round.round_index);

            match self.scores.has_score(&key).await {
                Ok(true) => {
                    report.kept += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(judge_id = %key.judge_id, "Score lookup failed: {}", e);
                    report.failed += 1;
                    continue;
                }
            }

            let (ratings, promoted) = match self.drafts.get_draft(&key) {
                Some(draft) => (draft.ratings.clamp(), true),
                None => (Ratings::MINIMUM, false),
            };

            match self.scores.record_score(&key, ratings, now_millis()).await {
                Ok(score) => {
                    if promoted {
                        report.promoted += 1;
                    } else {
                        report.defaulted += 1;
                    }
                    debug!(judge_id = %key.judge_id, promoted, "Reconciled score recorded");
                    self.hub
                        .publish(ServerEvent::ScoreSubmitted(score), Target::Directors);
                }
                Err(EngineError::DuplicateScore { .. }) => {
                    // A submission landed between the lookup and the insert
                    warn!(judge_id = %key.judge_id, "Judge submitted during reconciliation");
                    report.kept += 1;
                }
                Err(e) => {
                    error!(judge_id = %key.judge_id, "Failed to persist reconciled score: {}", e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

fn target_for(round: &Round) -> Target {
    match &round.track {
        Some(track) => Target::Track(track.clone()),
        None => Target::All,
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
