//! Session hub
//!
//! One task owns the [`SessionStore`] and every connection's outbox.
//! Commands arrive over a single channel and are handled one at a time,
//! so a state change and its broadcast are never interleaved with another
//! event. Any connection may drive any session; the last event wins.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use jamsync_common::events::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use super::store::{ConnectionId, SessionStore};

/// Events queued per connection before new ones are dropped
pub const OUTBOX_CAPACITY: usize = 64;

/// Work for the hub task
#[derive(Debug)]
pub enum HubCommand {
    Connect {
        conn: ConnectionId,
        outbox: mpsc::Sender<ServerEvent>,
    },
    Event {
        conn: ConnectionId,
        event: ClientEvent,
    },
    Disconnect {
        conn: ConnectionId,
    },
}

/// Cloneable handle used by socket handlers to talk to the hub
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubCommand>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    /// Register a new connection and get its inbound event stream
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let conn = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (outbox, inbox) = mpsc::channel(OUTBOX_CAPACITY);
        self.submit(HubCommand::Connect { conn, outbox });
        (conn, inbox)
    }

    /// Forward a decoded client event
    pub fn send(&self, conn: ConnectionId, event: ClientEvent) {
        self.submit(HubCommand::Event { conn, event });
    }

    /// Connection closed, gracefully or not
    pub fn disconnect(&self, conn: ConnectionId) {
        self.submit(HubCommand::Disconnect { conn });
    }

    fn submit(&self, command: HubCommand) {
        if self.tx.send(command).is_err() {
            warn!("Session hub has stopped; command dropped");
        }
    }
}

/// Hub task state
pub struct Hub {
    store: SessionStore,
    outboxes: HashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
    groups: HashMap<String, BTreeSet<ConnectionId>>,
}

impl Hub {
    pub fn new(default_bpm: i64) -> Self {
        Self {
            store: SessionStore::new(default_bpm),
            outboxes: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Spawn the hub task, returning the handle used to reach it
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn(default_bpm: i64) -> HubHandle {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut hub = Hub::new(default_bpm);

        tokio::spawn(async move {
            info!(default_bpm, "Session hub started");
            while let Some(command) = rx.recv().await {
                hub.handle(command);
            }
            info!("Session hub stopped");
        });

        HubHandle {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Apply one command and emit its events
    pub fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect { conn, outbox } => {
                debug!(conn = %conn, "Connection opened");
                self.outboxes.insert(conn, outbox);
            }
            HubCommand::Event { conn, event } => self.handle_event(conn, event),
            HubCommand::Disconnect { conn } => self.handle_disconnect(conn),
        }
    }

    fn handle_event(&mut self, conn: ConnectionId, event: ClientEvent) {
        debug!(conn = %conn, event = event.name(), session_id = %event.session_id(), "Session event");

        match event {
            ClientEvent::JoinSession { session_id, user_id } => {
                let snapshot = self.store.add_member(&session_id, conn, &user_id).snapshot();
                self.groups.entry(session_id.clone()).or_default().insert(conn);
                info!(
                    session_id = %session_id,
                    user_id = %user_id,
                    members = snapshot.members.len(),
                    "Participant joined"
                );

                self.deliver(conn, ServerEvent::SessionState(snapshot));
                self.broadcast_except(&session_id, conn, &ServerEvent::MemberJoined { user_id });
            }
            ClientEvent::ConductorAdvance { session_id, line_index } => {
                self.store.set_line(&session_id, line_index);
                self.broadcast(&session_id, &ServerEvent::LineChanged { line_index });
            }
            ClientEvent::TransposeChange { session_id, semitones } => {
                let snapshot = self.store.set_transpose(&session_id, semitones).snapshot();
                self.broadcast(&session_id, &ServerEvent::SessionState(snapshot));
            }
            ClientEvent::BpmChange { session_id, bpm } => {
                let snapshot = self.store.set_bpm(&session_id, bpm).snapshot();
                self.broadcast(&session_id, &ServerEvent::SessionState(snapshot));
            }
        }
    }

    fn handle_disconnect(&mut self, conn: ConnectionId) {
        self.outboxes.remove(&conn);
        for group in self.groups.values_mut() {
            group.remove(&conn);
        }
        self.groups.retain(|_, group| !group.is_empty());

        for (session_id, user_id) in self.store.remove_connection(conn) {
            info!(session_id = %session_id, user_id = %user_id, "Participant left");
            self.broadcast(&session_id, &ServerEvent::MemberLeft { participant_id: user_id });
        }
        debug!(conn = %conn, "Connection closed");
    }

    /// Queue an event without waiting on the socket writer
    ///
    /// A full outbox drops the event. A closed one means the socket is
    /// going away and its Disconnect follows.
    fn deliver(&self, conn: ConnectionId, event: ServerEvent) {
        let Some(outbox) = self.outboxes.get(&conn) else {
            return;
        };
        match outbox.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                warn!(conn = %conn, event = event.name(), "Outbox full; event dropped");
            }
        }
    }

    fn broadcast(&self, session_id: &str, event: &ServerEvent) {
        self.broadcast_filtered(session_id, event, None);
    }

    fn broadcast_except(&self, session_id: &str, skip: ConnectionId, event: &ServerEvent) {
        self.broadcast_filtered(session_id, event, Some(skip));
    }

    fn broadcast_filtered(&self, session_id: &str, event: &ServerEvent, skip: Option<ConnectionId>) {
        let Some(group) = self.groups.get(session_id) else {
            return;
        };
        for conn in group.iter().filter(|c| Some(**c) != skip) {
            self.deliver(*conn, event.clone());
        }
    }
}
