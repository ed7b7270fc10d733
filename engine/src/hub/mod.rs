//! Realtime broadcast hub
//!
//! The hub maps connected clients to the channels they follow and fans
//! server events out to them. Each connection owns a bounded outbound
//! queue; publishing never waits on a client. A full queue drops the event
//! for that client only, and a closed queue removes the connection.
//!
//! # Channels
//! - `User(id)`: personal channel joined by `identify`
//! - `Track(label)`: joined for every track the identified user is assigned to
//! - `Directors`: joined by `joinDirectors`
//!
//! Track-scoped events are also delivered to the directors channel so the
//! director console sees every round.

use sdk::protocol::ServerEvent;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Opaque handle for one client connection
pub type ConnectionId = u64;

/// Subscription channels
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum Channel {
    User(String),
    Track(String),
    Directors,
}

/// Addressing for `publish`
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Target {
    /// Every connected client
    All,
    /// Clients following a track, plus directors
    Track(String),
    /// One user's personal channel
    User(String),
    Directors,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
    channels: HashMap<Channel, HashSet<ConnectionId>>,
}

/// Fan-out hub shared by every connection handler and the scheduler
pub struct BroadcastHub {
    state: Mutex<HubState>,
    next_id: AtomicU64,
    buffer: usize,
}

impl BroadcastHub {
    /// Create a hub whose connections queue up to `buffer` events each
    pub fn new(buffer: usize) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register a new connection and return its outbound queue
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.lock().connections.insert(id, tx);
        debug!(connection = id, "Connection registered");
        (id, rx)
    }

    /// Remove a connection from the hub and from every channel
    pub fn disconnect(&self, id: ConnectionId) {
        let mut state = self.lock();
        state.connections.remove(&id);
        state.channels.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
        debug!(connection = id, "Connection removed");
    }

    /// Join the connection to the user's personal channel. Idempotent.
    pub fn subscribe(&self, id: ConnectionId, user_id: &str) -> bool {
        self.join(id, Channel::User(user_id.to_string()))
    }

    /// Join the connection to a track channel. Idempotent.
    pub fn join_track(&self, id: ConnectionId, track: &str) -> bool {
        self.join(id, Channel::Track(track.to_string()))
    }

    /// Join the connection to the directors channel. Idempotent.
    pub fn join_directors(&self, id: ConnectionId) -> bool {
        self.join(id, Channel::Directors)
    }

    fn join(&self, id: ConnectionId, channel: Channel) -> bool {
        let mut state = self.lock();
        if !state.connections.contains_key(&id) {
            return false;
        }
        state.channels.entry(channel).or_default().insert(id);
        true
    }

    /// Deliver an event to every connection matching `target`
    ///
    /// Recipients are snapshotted under the lock and sent to after it is
    /// released. Returns the number of connections the event was queued for.
    pub fn publish(&self, event: ServerEvent, target: Target) -> usize {
        let recipients: Vec<(ConnectionId, mpsc::Sender<ServerEvent>)> = {
            let state = self.lock();
            let ids: HashSet<ConnectionId> = match &target {
                Target::All => state.connections.keys().copied().collect(),
                Target::Track(track) => state
                    .members(&Channel::Track(track.clone()))
                    .chain(state.members(&Channel::Directors))
                    .collect(),
                Target::User(user_id) => state.members(&Channel::User(user_id.clone())).collect(),
                Target::Directors => state.members(&Channel::Directors).collect(),
            };
            ids.into_iter()
                .filter_map(|id| state.connections.get(&id).map(|tx| (id, tx.clone())))
                .collect()
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in recipients {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        connection = id,
                        event = event.name(),
                        "Client queue full, dropping event"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id),
            }
        }

        for id in closed {
            self.disconnect(id);
        }

        debug!(event = event.name(), ?target, delivered, "Event published");
        delivered
    }

    /// Send an event to a single connection (used for rejections)
    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) -> bool {
        let tx = self.lock().connections.get(&id).cloned();
        match tx {
            Some(tx) => tx.try_send(event).is_ok(),
            None => false,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubState> {
        self.state.lock().expect("BroadcastHub lock poisoned")
    }
}

impl HubState {
    fn members<'a>(&'a self, channel: &Channel) -> impl Iterator<Item = ConnectionId> + 'a {
        self.channels
            .get(channel)
            .into_iter()
            .flat_map(|members| members.iter().copied())
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(256)
    }
}
