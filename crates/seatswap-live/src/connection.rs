//! Participant connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use seatswap_core::{Seat, SessionId, UserId};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique connection identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub String);

impl Default for ConnectionId {
    fn default() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }
}

impl ConnectionId {
    /// A fresh random ID.
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a connection is attached to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatBinding {
    /// Session the connection follows.
    pub session_id: SessionId,
    /// Seat the participant plays, or `None` when watching.
    pub seat: Option<Seat>,
}

/// One connected participant.
pub struct Connection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Authenticated participant.
    pub user_id: UserId,
    binding: Mutex<Option<SeatBinding>>,
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Count of frames dropped due to a full or closed queue.
    pub dropped_messages: AtomicU64,
}

impl Connection {
    /// Create a new connection.
    pub fn new(id: ConnectionId, user_id: UserId, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            user_id,
            binding: Mutex::new(None),
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Follow a session without playing a seat.
    pub fn watch(&self, session_id: SessionId) {
        *self.binding.lock() = Some(SeatBinding {
            session_id,
            seat: None,
        });
    }

    /// Play `seat` of a session.
    pub fn bind_seat(&self, session_id: SessionId, seat: Seat) {
        *self.binding.lock() = Some(SeatBinding {
            session_id,
            seat: Some(seat),
        });
    }

    /// Current binding.
    pub fn binding(&self) -> Option<SeatBinding> {
        self.binding.lock().clone()
    }

    /// Whether the connection follows `session_id`.
    pub fn is_in_session(&self, session_id: &SessionId) -> bool {
        self.binding
            .lock()
            .as_ref()
            .is_some_and(|b| &b.session_id == session_id)
    }

    /// Queue a frame.
    ///
    /// Returns `false` if the queue is full or closed, and increments the
    /// dropped message counter.
    pub fn send(&self, frame: Arc<String>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
