//! Journal of scheduled jobs.

use chrono::Utc;
use seatswap_core::{Job, JobId, ScheduledJob, StoreError};
use tracing::instrument;

use crate::database::Database;
use crate::row_helpers;

/// Scheduled job persistence.
#[derive(Clone)]
pub struct JobRepo {
    db: Database,
}

impl JobRepo {
    /// Wrap a database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a job.
    #[instrument(skip(self, job), fields(job_id = %job.id, kind = job.job.kind()))]
    pub fn insert(&self, job: &ScheduledJob) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&job.job)?;
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO scheduled_jobs (id, kind, session_id, payload, due_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    job.id.as_str(),
                    job.job.kind(),
                    job.job.session_id().as_str(),
                    payload,
                    job.due_at.to_rfc3339(),
                    now,
                ],
            )?;
            Ok(())
        })
    }

    /// Remove a job. Removing an unknown job is not an error.
    #[instrument(skip(self), fields(job_id = %id))]
    pub fn delete(&self, id: &JobId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let _ = conn.execute("DELETE FROM scheduled_jobs WHERE id = ?1", [id.as_str()])?;
            Ok(())
        })
    }

    /// All recorded jobs, earliest due first.
    #[instrument(skip(self))]
    pub fn pending(&self) -> Result<Vec<ScheduledJob>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, payload, due_at FROM scheduled_jobs ORDER BY due_at, id")?;
            let mut rows = stmt.query([])?;
            let mut jobs = Vec::new();
            while let Some(row) = rows.next()? {
                jobs.push(row_to_job(row)?);
            }
            Ok(jobs)
        })
    }
}

fn row_to_job(row: &rusqlite::Row<'_>) -> Result<ScheduledJob, StoreError> {
    let id: String = row_helpers::get(row, 0, "scheduled_jobs", "id")?;
    let payload: String = row_helpers::get(row, 1, "scheduled_jobs", "payload")?;
    let due_at: String = row_helpers::get(row, 2, "scheduled_jobs", "due_at")?;
    Ok(ScheduledJob {
        id: JobId::from_raw(id),
        due_at: row_helpers::parse_timestamp(&due_at, "scheduled_jobs", "due_at")?,
        job: row_helpers::parse_json::<Job>(&payload, "scheduled_jobs", "payload")?,
    })
}
