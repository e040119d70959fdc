//! Registry of live connections and the [`Notifier`] implementation.

use std::sync::Arc;

use dashmap::DashMap;
use seatswap_core::constants::EVENT_SESSION_UPDATED;
use seatswap_core::{Notifier, NotifyError, Seat, Session, SessionId, UserId};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::connection::{Connection, ConnectionId};
use crate::event::LiveEvent;

/// All connected participants.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<Connection>>,
    send_queue_capacity: usize,
}

impl ConnectionRegistry {
    /// Create a registry whose connections buffer up to `send_queue_capacity` frames.
    pub fn new(send_queue_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            send_queue_capacity: send_queue_capacity.max(1),
        }
    }

    /// Register a connection for `user` and return its ID and outbound queue.
    pub fn register(&self, user: UserId) -> (ConnectionId, mpsc::Receiver<Arc<String>>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.send_queue_capacity);
        let conn = Arc::new(Connection::new(id.clone(), user, tx));
        let _ = self.connections.insert(id.clone(), conn);
        (id, rx)
    }

    /// Remove a connection. Its queue closes once the last handle is gone.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        self.connections.remove(id).is_some()
    }

    /// Look up a connection.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(id).map(|c| Arc::clone(c.value()))
    }

    /// Number of connections.
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Connections following a session.
    pub fn session_connections(&self, session_id: &SessionId) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .filter(|c| c.is_in_session(session_id))
            .map(|c| Arc::clone(c.value()))
            .collect()
    }

    /// Connections of a participant.
    pub fn user_connections(&self, user: &UserId) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .filter(|c| &c.user_id == user)
            .map(|c| Arc::clone(c.value()))
            .collect()
    }

    fn deliver(&self, event: &LiveEvent, recipients: &[Arc<Connection>]) -> Result<(), NotifyError> {
        let frame = Arc::new(event.to_frame()?);
        let failed = recipients
            .iter()
            .filter(|conn| !conn.send(Arc::clone(&frame)))
            .count();
        debug!(
            event_type = %event.event_type,
            recipients = recipients.len(),
            failed,
            "delivered live event"
        );
        if failed > 0 {
            return Err(NotifyError::Delivery {
                event: event.event_type.clone(),
                failed,
            });
        }
        Ok(())
    }
}

impl Notifier for ConnectionRegistry {
    fn broadcast(&self, session: &Session) -> Result<(), NotifyError> {
        let snapshot = serde_json::to_value(session)?;
        let event = LiveEvent::new(EVENT_SESSION_UPDATED, Some(session.id.clone()), snapshot);
        self.deliver(&event, &self.session_connections(&session.id))
    }

    fn direct(&self, user: &UserId, event: &str, payload: Value) -> Result<(), NotifyError> {
        let event = LiveEvent::new(event, None, payload);
        self.deliver(&event, &self.user_connections(user))
    }

    fn disconnect(&self, session_id: &SessionId, user: &UserId) -> Result<(), NotifyError> {
        let doomed: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|c| &c.user_id == user && c.is_in_session(session_id))
            .map(|c| c.id.clone())
            .collect();
        for id in &doomed {
            let _ = self.unregister(id);
        }
        info!(
            session_id = %session_id,
            user_id = %user,
            closed = doomed.len(),
            "disconnected participant"
        );
        Ok(())
    }

    fn bind_seat(&self, session_id: &SessionId, user: &UserId, seat: Seat) -> Result<bool, NotifyError> {
        // Connections following some other session keep their binding.
        let conns: Vec<_> = self
            .user_connections(user)
            .into_iter()
            .filter(|c| c.binding().is_none_or(|b| &b.session_id == session_id))
            .collect();
        for conn in &conns {
            conn.bind_seat(session_id.clone(), seat);
        }
        Ok(!conns.is_empty())
    }

    fn announce(&self, session_id: &SessionId, event: &str, payload: Value) -> Result<(), NotifyError> {
        let event = LiveEvent::new(event, Some(session_id.clone()), payload);
        self.deliver(&event, &self.session_connections(session_id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
