//! Error hierarchy.
//!
//! - [`ReplacementError`]: outcomes of the replacement protocol. All but
//!   [`ReplacementError::CorruptProposal`] are ordinary rejections caused by
//!   races between clients and are reported back to the caller.
//! - [`Ineligible`]: why a seat may not be contested right now.
//! - [`StoreError`], [`DirectoryError`], [`NotifyError`], [`ScheduleError`]:
//!   failures of the collaborators.

use thiserror::Error;

use crate::ids::{SessionId, UserId};
use crate::session::{Seat, SessionStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Replacement protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Why a substitution may not be started.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Ineligible {
    /// The session is not running.
    #[error("session is {0}, not running")]
    NotRunning(SessionStatus),
    /// Another proposal is already open.
    #[error("a replacement is already in progress")]
    ReplacementInProgress,
    /// Only the seat on turn may be contested.
    #[error("seat {target} is not on turn (seat {active} is)")]
    NotOnTurn {
        /// Seat that was targeted.
        target: Seat,
        /// Seat currently on turn.
        active: Seat,
    },
    /// The seat on turn has not been idle long enough.
    #[error("seat has only been idle for {idle_ms}ms")]
    NotIdle {
        /// Milliseconds since the last accepted move.
        idle_ms: i64,
    },
    /// The candidate already plays in this session.
    #[error("user {0} already occupies a seat")]
    CandidateSeated(UserId),
}

/// Replacement protocol error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReplacementError {
    /// No proposal is open on the session.
    #[error("no active replacement")]
    NoActiveReplacement,

    /// This seat already voted to accept.
    #[error("seat {0} already accepted the replacement")]
    AlreadyAccepted(Seat),

    /// The seat being replaced cannot vote for its own replacement.
    #[error("seat {0} cannot accept its own replacement")]
    CannotAcceptOwnReplacement(Seat),

    /// The candidate could not be resolved in the user directory.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// `start` was called while a proposal is already open.
    #[error("a replacement is already active")]
    AlreadyActive,

    /// The voter holds no seat in the session.
    #[error("user {0} holds no seat in this session")]
    NotSeated(UserId),

    /// The target seat is outside the session's seat range.
    #[error("seat {seat} is out of range for {n_players} players")]
    InvalidSeat {
        /// Requested seat.
        seat: Seat,
        /// Number of seats in the session.
        n_players: usize,
    },

    /// The eligibility check failed.
    #[error("not eligible: {0}")]
    Ineligible(#[from] Ineligible),

    /// Quorum was reached on a proposal whose target seat does not exist.
    #[error("replacement proposal is corrupt: {0}")]
    CorruptProposal(String),
}

impl ReplacementError {
    /// Whether this indicates a programmer error rather than a client race.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CorruptProposal(_))
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NoActiveReplacement => "no_active_replacement",
            Self::AlreadyAccepted(_) => "already_accepted",
            Self::CannotAcceptOwnReplacement(_) => "cannot_accept_own_replacement",
            Self::UserNotFound(_) => "user_not_found",
            Self::AlreadyActive => "already_active",
            Self::NotSeated(_) => "not_seated",
            Self::InvalidSeat { .. } => "invalid_seat",
            Self::Ineligible(_) => "ineligible",
            Self::CorruptProposal(_) => "corrupt_proposal",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// Session store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The session does not exist.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),

    /// A persisted row could not be decoded.
    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        /// Table name.
        table: &'static str,
        /// Column name.
        column: &'static str,
        /// What went wrong.
        detail: String,
    },

    /// Serialization of state failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem failure while opening the store.
    #[error("IO error: {0}")]
    Io(String),

    /// Internal failure (e.g. a blocking task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// User directory failure.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No such user.
    #[error("user not found: {0}")]
    NotFound(UserId),

    /// The directory could not be queried.
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Live notification failure. Never fails a transition.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The payload could not be serialized.
    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Some recipients could not be reached.
    #[error("failed to deliver {event} to {failed} connection(s)")]
    Delivery {
        /// Event type.
        event: String,
        /// Number of connections the frame was dropped for.
        failed: usize,
    },
}

/// Deferred job scheduling failure.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The scheduler has been shut down.
    #[error("scheduler is shut down")]
    ShutDown,

    /// The job could not be journaled.
    #[error("failed to journal job: {0}")]
    Journal(#[from] StoreError),

    /// The due time is not representable.
    #[error("due time out of range: {0}")]
    DueOutOfRange(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
