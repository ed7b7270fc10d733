//! HTTP and WebSocket surface
//!
//! Serves the judge/director realtime channel on `/ws` and the director
//! control and roster endpoints under `/api`.
//!
//! # Endpoints
//!
//! - GET  /ws               - Realtime event channel
//! - POST /api/start        - Start a presentation
//! - POST /api/advance      - End the active presentation
//! - GET  /api/current      - Active round and remaining time
//! - GET  /api/scores       - All scores, newest first
//! - POST /api/login        - Register a user
//! - GET  /api/users        - List users
//! - GET  /api/participants - List participants
//! - POST /api/participants - Create a participant
//! - GET  /api/assignments  - List assignments
//! - POST /api/assign       - Assign a judge

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::{Database, RosterRepository, ScoreRepository};
use crate::drafts::DraftCache;
use crate::hub::BroadcastHub;
use crate::scheduler::{Scheduler, SchedulerSettings};
use crate::session::SessionRelay;

mod routes;

pub use routes::ApiError;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub relay: SessionRelay,
    pub hub: Arc<BroadcastHub>,
    pub scores: ScoreRepository,
    pub roster: RosterRepository,
}

impl AppState {
    /// Wire the session components on top of an open database
    pub fn new(config: &Config, db: &Database) -> Self {
        let hub = Arc::new(BroadcastHub::new(config.server.outbound_buffer));
        let drafts = DraftCache::new();
        let scores = db.scores();
        let roster = db.roster();

        let scheduler = Scheduler::new(
            Arc::clone(&hub),
            drafts.clone(),
            Arc::new(scores.clone()),
            Arc::new(roster.clone()),
            SchedulerSettings {
                default_duration: config.session.default_duration(),
                filter_by_track: config.session.filter_by_track,
            },
        );

        let relay = SessionRelay::new(
            Arc::clone(&hub),
            drafts,
            Arc::new(scores.clone()),
            Arc::new(roster.clone()),
        );

        Self {
            scheduler,
            relay,
            hub,
            scores,
            roster,
        }
    }
}

/// A judging session server bound to one database
pub struct GavelServer {
    config: Config,
    db: Database,
    state: AppState,
}

impl GavelServer {
    /// Open the configured database and build the session state
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new(&config.database_path())
            .await
            .context("Failed to open score database")?;
        Ok(Self::with_database(config, db))
    }

    pub fn with_database(config: Config, db: Database) -> Self {
        let state = AppState::new(&config, &db);
        Self { config, db, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves,
    /// then close the database.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener
            .local_addr()
            .context("Failed to read listener address")?;
        info!("Gavel server listening on http://{}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server error")?;

        info!("Server stopped, closing database");
        self.db.close().await?;
        Ok(())
    }
}

/// Build the router over shared state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/start", post(routes::start_handler))
        .route("/api/advance", post(routes::advance_handler))
        .route("/api/current", get(routes::current_handler))
        .route("/api/scores", get(routes::scores_handler))
        .route("/api/login", post(routes::login_handler))
        .route("/api/users", get(routes::users_handler))
        .route(
            "/api/participants",
            get(routes::participants_handler).post(routes::create_participant_handler),
        )
        .route("/api/assignments", get(routes::assignments_handler))
        .route("/api/assign", post(routes::assign_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Pump one connection: inbound frames to the relay, hub events to the socket
async fn handle_websocket(mut socket: WebSocket, state: AppState) {
    let (conn, mut outbound) = state.hub.connect();
    info!(connection = conn, "WebSocket connection established");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(connection = conn, "Received frame: {}", text);
                        state.relay.handle_frame(conn, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(connection = conn, "WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            event = outbound.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode {} event: {}", event.name(), e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub.disconnect(conn);
    info!(connection = conn, "WebSocket connection closed");
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
