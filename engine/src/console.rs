//! Director console client
//!
//! Connects outward to a running session server as a WebSocket client,
//! joins the directors channel and streams every server event back to the
//! caller.
//!
//! Features:
//! - Auto-reconnect with a fixed delay
//! - Re-joins the directors channel after each reconnect
//! - Human-readable one-line rendering of events

use futures::stream::StreamExt;
use futures::SinkExt;
use sdk::protocol::{ClientEvent, ServerEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info, warn};

/// Console connection settings
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Server WebSocket URL, e.g. `ws://127.0.0.1:4000/ws`
    pub url: String,
    pub reconnect_delay: Duration,
}

impl ConsoleConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

/// Start the console client.
///
/// Spawns the reconnect loop in the background and returns the stream of
/// events received on the directors channel. Dropping the receiver stops
/// the loop.
pub fn start(config: ConsoleConfig) -> mpsc::Receiver<ServerEvent> {
    let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(256);
    tokio::spawn(reconnect_loop(config, event_tx));
    event_rx
}

async fn reconnect_loop(config: ConsoleConfig, event_tx: mpsc::Sender<ServerEvent>) {
    loop {
        info!("Console connecting to {}", config.url);

        match tokio_tungstenite::connect_async(&config.url).await {
            Ok((ws_stream, _response)) => {
                info!("Console connected to {}", config.url);

                let (mut write, mut read) = ws_stream.split();

                match serde_json::to_string(&ClientEvent::JoinDirectors) {
                    Ok(json) => {
                        if let Err(e) = write.send(WsMessage::Text(json)).await {
                            warn!("Failed to join directors channel: {}", e);
                        }
                    }
                    Err(e) => error!("Failed to encode joinDirectors: {}", e),
                }

                loop {
                    match read.next().await {
                        Some(Ok(WsMessage::Text(text))) => {
                            let event: ServerEvent = match serde_json::from_str(&text) {
                                Ok(event) => event,
                                Err(e) => {
                                    warn!("Unrecognised server frame: {} (raw: {})", e, text);
                                    continue;
                                }
                            };
                            if event_tx.send(event).await.is_err() {
                                info!("Console receiver dropped, disconnecting");
                                return;
                            }
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            let _ = write.send(WsMessage::Pong(data)).await;
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            info!("Console connection closed by server");
                            break;
                        }
                        Some(Err(e)) => {
                            warn!("Console read error: {}", e);
                            break;
                        }
                        _ => {}
                    }
                }
            }
            Err(e) => {
                error!("Console failed to connect: {}", e);
            }
        }

        if event_tx.is_closed() {
            return;
        }

        info!(
            "Console reconnecting in {}s...",
            config.reconnect_delay.as_secs_f32()
        );
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

/// Render an event as a single console line
pub fn describe(event: &ServerEvent) -> String {
    match event {
        ServerEvent::PresentParticipant(round) => format!(
            "▶ presenting {} (round {}, {}s{})",
            round.participant_id,
            round.round_index,
            round.duration_ms / 1000,
            round
                .track
                .as_deref()
                .map(|t| format!(", track {}", t))
                .unwrap_or_default()
        ),
        ServerEvent::AdvanceParticipant(id) => {
            format!("■ finished {} (round {})", id.participant_id, id.round_index)
        }
        ServerEvent::ScoreSubmitted(score) => format!(
            "✓ {} scored {} round {}: creativity {} execution {} usability {}",
            score.judge_id,
            score.participant_id,
            score.round_index,
            score.creativity,
            score.execution,
            score.usability
        ),
        ServerEvent::AssignmentChanged(change) => format!(
            "• {} assigned{}{}",
            change.judge_id,
            change
                .participant_id
                .as_deref()
                .map(|p| format!(" to {}", p))
                .unwrap_or_default(),
            change
                .role_label
                .as_deref()
                .map(|l| format!(" as {}", l))
                .unwrap_or_default()
        ),
        ServerEvent::Error(notice) => format!("✗ {} rejected: {}", notice.rejected, notice.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::{Round, RoundId, Score};

    #[test]
    fn test_describe_present() {
        let line = describe(&ServerEvent::PresentParticipant(Round {
            participant_id: "p1".to_string(),
            round_index: 0,
            track: Some("hardware".to_string()),
            start_time: 0,
            duration_ms: 180_000,
        }));
        assert_eq!(line, "▶ presenting p1 (round 0, 180s, track hardware)");
    }

    #[test]
    fn test_describe_score_and_advance() {
        let score = Score {
            id: "s1".to_string(),
            judge_id: "j1".to_string(),
            participant_id: "p1".to_string(),
            creativity: 7,
            execution: 8,
            usability: 6,
            round_index: 0,
            submitted_at: 0,
        };
        assert_eq!(
            describe(&ServerEvent::ScoreSubmitted(score)),
            "✓ j1 scored p1 round 0: creativity 7 execution 8 usability 6"
        );
        assert_eq!(
            describe(&ServerEvent::AdvanceParticipant(RoundId {
                participant_id: "p1".to_string(),
                round_index: 0,
            })),
            "■ finished p1 (round 0)"
        );
    }
}
