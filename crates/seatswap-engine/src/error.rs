//! Engine error type.

use seatswap_core::{DirectoryError, ReplacementError, ScheduleError, StoreError};
use thiserror::Error;

/// Everything an engine call can fail with.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The protocol refused the call.
    #[error(transparent)]
    Replacement(#[from] ReplacementError),

    /// Reading or writing state failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The user directory could not be queried.
    #[error("user directory error: {0}")]
    Directory(DirectoryError),

    /// The expiry job could not be scheduled.
    #[error("scheduler error: {0}")]
    Schedule(#[from] ScheduleError),
}

impl From<DirectoryError> for EngineError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound(user) => Self::Replacement(ReplacementError::UserNotFound(user)),
            other => Self::Directory(other),
        }
    }
}

impl EngineError {
    /// Whether this is an ordinary refusal the caller should simply report,
    /// as opposed to a bug or an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::Replacement(e) => !e.is_fatal(),
            Self::Store(StoreError::NotFound(_)) => true,
            _ => false,
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Replacement(e) => e.error_kind(),
            Self::Store(StoreError::NotFound(_)) => "session_not_found",
            Self::Store(_) => "store",
            Self::Directory(_) => "directory",
            Self::Schedule(_) => "schedule",
        }
    }
}

#[cfg(test)]
mod tests {
    use seatswap_core::{Seat, SessionId, UserId};

    use super::*;

    #[test]
    fn directory_not_found_becomes_user_not_found() {
        let err: EngineError = DirectoryError::NotFound(UserId::from("ghost")).into();
        assert!(matches!(
            err,
            EngineError::Replacement(ReplacementError::UserNotFound(ref u)) if u.as_str() == "ghost"
        ));
        assert!(err.is_rejection());
    }

    #[test]
    fn directory_outage_is_not_a_rejection() {
        let err: EngineError = DirectoryError::Unavailable("timeout".into()).into();
        assert!(!err.is_rejection());
        assert_eq!(err.error_kind(), "directory");
    }

    #[test]
    fn classification() {
        assert!(EngineError::from(ReplacementError::AlreadyAccepted(Seat(1))).is_rejection());
        assert!(!EngineError::from(ReplacementError::CorruptProposal("x".into())).is_rejection());
        assert!(EngineError::from(StoreError::NotFound(SessionId::from_raw("sess_1"))).is_rejection());
        assert!(!EngineError::from(StoreError::Database("locked".into())).is_rejection());
        assert!(!EngineError::from(ScheduleError::ShutDown).is_rejection());
    }

    #[test]
    fn replacement_display_is_transparent() {
        let err = EngineError::from(ReplacementError::NoActiveReplacement);
        assert_eq!(err.to_string(), "no active replacement");
        assert_eq!(err.error_kind(), "no_active_replacement");
    }
}
