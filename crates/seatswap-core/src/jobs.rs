//! Deferred jobs.
//!
//! Jobs carry only the session they concern. Whatever state they act on is
//! re-read when they fire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{JobId, SessionId};

/// Work to run at a later time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Job {
    /// Clear the session's replacement proposal if it has outlived its
    /// maximum duration.
    ExpireReplacement {
        /// Session to check.
        session_id: SessionId,
    },
}

impl Job {
    /// Session the job concerns.
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::ExpireReplacement { session_id } => session_id,
        }
    }

    /// Short name for logs and the job journal.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExpireReplacement { .. } => "expire_replacement",
        }
    }
}

/// A job with its schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    /// Job identifier.
    pub id: JobId,
    /// Earliest time the job may run.
    pub due_at: DateTime<Utc>,
    /// The work.
    pub job: Job,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_json_is_tagged() {
        let job = Job::ExpireReplacement {
            session_id: SessionId::from_raw("sess_1"),
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["kind"], "expire_replacement");
        assert_eq!(json["session_id"], "sess_1");
        assert_eq!(job.kind(), "expire_replacement");
        assert_eq!(job.session_id().as_str(), "sess_1");
    }
}
