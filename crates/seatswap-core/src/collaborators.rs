//! Seams between the replacement engine and the outside world.
//!
//! The engine only talks to these traits. Production implementations live
//! in `seatswap-store` (SQLite), `seatswap-live` (connection registry) and
//! `seatswap-engine::scheduler` (tokio timers).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::{DirectoryError, NotifyError, ScheduleError, StoreError};
use crate::ids::{JobId, SessionId, UserId};
use crate::jobs::{Job, ScheduledJob};
use crate::replacement::Substitution;
use crate::session::{Seat, Session, Slot};

/// Durable session state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session. [`StoreError::NotFound`] if it does not exist.
    async fn read(&self, id: &SessionId) -> Result<Session, StoreError>;

    /// Persist the full session.
    async fn write(&self, session: &Session) -> Result<(), StoreError>;

    /// Update the membership index of `user` in a session.
    ///
    /// With `from = Some(slot)` the user's existing membership at `slot`
    /// moves to `to`. With `from = None` a new membership at `to` is added.
    async fn reassign_seat_owner(
        &self,
        session_id: &SessionId,
        from: Option<Slot>,
        to: Slot,
        user: &UserId,
    ) -> Result<(), StoreError>;

    /// Persist a committed substitution atomically: the outgoing membership
    /// moves to the archive slot, the incoming one is added at the seat and
    /// the session is written. On error none of it is applied.
    async fn commit_substitution(&self, session: &Session, sub: &Substitution) -> Result<(), StoreError>;
}

/// Display names of participants.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Display name of `user`. [`DirectoryError::NotFound`] if unknown.
    async fn resolve(&self, user: &UserId) -> Result<String, DirectoryError>;
}

/// Best-effort push to connected participants.
///
/// Calls never block. Failures are reported so the caller can log them, but
/// they never roll back a state transition.
pub trait Notifier: Send + Sync {
    /// Send the session snapshot to everyone connected to it.
    fn broadcast(&self, session: &Session) -> Result<(), NotifyError>;

    /// Send an event to every connection of one participant.
    fn direct(&self, user: &UserId, event: &str, payload: serde_json::Value) -> Result<(), NotifyError>;

    /// Close the participant's connections to the session.
    fn disconnect(&self, session_id: &SessionId, user: &UserId) -> Result<(), NotifyError>;

    /// Bind the participant's connections to a seat of the session.
    /// Connections following a different session are left alone.
    /// Returns whether any connection was bound.
    fn bind_seat(&self, session_id: &SessionId, user: &UserId, seat: Seat) -> Result<bool, NotifyError>;

    /// Send a named event to everyone connected to the session.
    fn announce(&self, session_id: &SessionId, event: &str, payload: serde_json::Value) -> Result<(), NotifyError>;
}

/// Runs jobs at a later time.
pub trait DeferredJobService: Send + Sync {
    /// Arrange for `job` to run at `due_at`.
    fn schedule(&self, due_at: DateTime<Utc>, job: Job) -> Result<JobId, ScheduleError>;
}

/// Durable record of scheduled jobs, so timers survive a restart.
pub trait JobJournal: Send + Sync {
    /// Remember a job.
    fn record(&self, job: &ScheduledJob) -> Result<(), StoreError>;

    /// Forget a job that has run.
    fn complete(&self, id: &JobId) -> Result<(), StoreError>;

    /// Jobs recorded but not completed, earliest first.
    fn pending(&self) -> Result<Vec<ScheduledJob>, StoreError>;
}
