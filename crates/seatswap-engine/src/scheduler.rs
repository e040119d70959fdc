//! Deferred jobs on tokio timers.
//!
//! [`TokioScheduler`] arms one timer task per job. When a timer fires the job
//! is handed to the [`JobDispatcher`], which runs it against the engine. Jobs
//! are journaled when a [`JobJournal`] is configured, so [`TokioScheduler::recover`]
//! can re-arm them after a restart. Jobs are never cancelled individually;
//! the engine re-validates state when they run.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use seatswap_core::{Clock, DeferredJobService, Job, JobId, JobJournal, ScheduleError, ScheduledJob};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::ReplacementEngine;

/// Timer-backed [`DeferredJobService`].
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<ScheduledJob>,
    journal: Option<Arc<dyn JobJournal>>,
    clock: Arc<dyn Clock>,
    /// Timer tasks.
    timers: Mutex<JoinSet<()>>,
    /// Timers still waiting (atomic for lock-free reads).
    pending: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl TokioScheduler {
    /// Create a scheduler and the dispatcher that receives its due jobs.
    pub fn new(clock: Arc<dyn Clock>, journal: Option<Arc<dyn JobJournal>>) -> (Self, JobDispatcher) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            journal: journal.clone(),
            clock,
            timers: Mutex::new(JoinSet::new()),
            pending: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
        };
        (scheduler, JobDispatcher { rx, journal })
    }

    /// Re-arm every journaled job. Past-due jobs fire immediately.
    pub fn recover(&self) -> Result<usize, ScheduleError> {
        let Some(journal) = &self.journal else {
            return Ok(0);
        };
        let pending = journal.pending()?;
        let count = pending.len();
        for job in pending {
            self.arm(job);
        }
        if count > 0 {
            info!(count, "recovered scheduled jobs");
        }
        Ok(count)
    }

    /// Number of timers still waiting.
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Cancel all waiting timers and wait for their tasks to end.
    /// Journaled jobs stay journaled.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut timers = std::mem::take(&mut *self.timers.lock());
        while let Some(result) = timers.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "timer task panicked");
            }
        }
        debug!("scheduler shut down");
    }

    fn arm(&self, scheduled: ScheduledJob) {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        let clock = Arc::clone(&self.clock);
        let pending = Arc::clone(&self.pending);
        let _ = pending.fetch_add(1, Ordering::Relaxed);

        let mut timers = self.timers.lock();
        // Reap finished timers so the set only holds live ones.
        while timers.try_join_next().is_some() {}
        let _ = timers.spawn(async move {
            fire_when_due(scheduled, clock, tx, cancel).await;
            let _ = pending.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

/// Sleep until the job's due time has strictly passed on `clock`, then hand
/// it to the dispatcher.
async fn fire_when_due(
    scheduled: ScheduledJob,
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<ScheduledJob>,
    cancel: CancellationToken,
) {
    while let Some(wait) = remaining(clock.as_ref(), scheduled.due_at) {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(job_id = %scheduled.id, "timer cancelled");
                return;
            }
            () = tokio::time::sleep(wait) => {}
        }
    }
    let job_id = scheduled.id.clone();
    if tx.send(scheduled).is_err() {
        warn!(job_id = %job_id, "job dispatcher gone, dropping job");
    }
}

/// Time to sleep before `due_at` has strictly passed on `clock`, or `None`
/// once it has.
fn remaining(clock: &dyn Clock, due_at: DateTime<Utc>) -> Option<Duration> {
    let left = due_at - clock.now();
    if left < TimeDelta::zero() {
        return None;
    }
    Some(left.to_std().unwrap_or(Duration::ZERO) + Duration::from_millis(1))
}

impl DeferredJobService for TokioScheduler {
    fn schedule(&self, due_at: DateTime<Utc>, job: Job) -> Result<JobId, ScheduleError> {
        if self.cancel.is_cancelled() {
            return Err(ScheduleError::ShutDown);
        }
        let scheduled = ScheduledJob {
            id: JobId::new(),
            due_at,
            job,
        };
        if let Some(journal) = &self.journal {
            journal.record(&scheduled)?;
        }
        let id = scheduled.id.clone();
        debug!(job_id = %id, kind = scheduled.job.kind(), due_at = %due_at, "job scheduled");
        self.arm(scheduled);
        Ok(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Receives due jobs from a [`TokioScheduler`].
pub struct JobDispatcher {
    rx: mpsc::UnboundedReceiver<ScheduledJob>,
    journal: Option<Arc<dyn JobJournal>>,
}

impl JobDispatcher {
    /// Wait for the next due job.
    pub async fn next_due(&mut self) -> Option<ScheduledJob> {
        self.rx.recv().await
    }

    /// Run due jobs against `engine` until the scheduler is dropped.
    pub fn spawn(self, engine: Arc<ReplacementEngine>) -> JoinHandle<()> {
        tokio::spawn(self.run(engine))
    }

    async fn run(mut self, engine: Arc<ReplacementEngine>) {
        while let Some(scheduled) = self.next_due().await {
            let kind = scheduled.job.kind();
            match engine.run_job(&scheduled.job).await {
                Ok(()) => {
                    debug!(job_id = %scheduled.id, kind, "job done");
                    self.complete(&scheduled.id);
                }
                // The session is gone or the call was refused; retrying won't help.
                Err(e) if e.is_rejection() => {
                    debug!(job_id = %scheduled.id, kind, error = %e, "job had nothing to do");
                    self.complete(&scheduled.id);
                }
                // Stays journaled and is retried by the next recover().
                Err(e) => {
                    warn!(job_id = %scheduled.id, kind, error = %e, "job failed");
                }
            }
        }
        debug!("job dispatcher stopped");
    }

    fn complete(&self, id: &JobId) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.complete(id) {
                warn!(job_id = %id, error = %e, "failed to clear journaled job");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use seatswap_core::{ManualClock, SessionId};
    use seatswap_store::{Database, SqliteJobJournal};

    use super::*;

    /// Wall clock driven by tokio's (pausable) time.
    #[derive(Clone)]
    struct TokioClock {
        base: DateTime<Utc>,
        start: tokio::time::Instant,
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            self.base + TimeDelta::from_std(self.start.elapsed()).unwrap_or(TimeDelta::zero())
        }
    }

    fn clock() -> TokioClock {
        TokioClock {
            base: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            start: tokio::time::Instant::now(),
        }
    }

    #[test]
    fn remaining_is_none_only_after_due_time() {
        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let due = clock.now() + TimeDelta::seconds(2);
        assert_eq!(remaining(&clock, due), Some(Duration::from_millis(2_001)));
        clock.advance(TimeDelta::seconds(2));
        assert_eq!(remaining(&clock, due), Some(Duration::from_millis(1)));
        clock.advance(TimeDelta::milliseconds(1));
        assert_eq!(remaining(&clock, due), None);
    }

    fn expire_job(id: &str) -> Job {
        Job::ExpireReplacement {
            session_id: SessionId::from_raw(id),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_fires_at_due_time() {
        let clock = clock();
        let (scheduler, mut dispatcher) = TokioScheduler::new(Arc::new(clock.clone()), None);

        let id = scheduler
            .schedule(clock.now() + TimeDelta::seconds(60), expire_job("sess_1"))
            .unwrap();
        assert_eq!(scheduler.pending_count(), 1);

        let early = tokio::time::timeout(Duration::from_secs(59), dispatcher.next_due()).await;
        assert!(early.is_err());

        let due = tokio::time::timeout(Duration::from_secs(2), dispatcher.next_due())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(due.id, id);
        assert_eq!(due.job, expire_job("sess_1"));
    }

    #[tokio::test(start_paused = true)]
    async fn past_due_job_fires_immediately() {
        let clock = clock();
        let (scheduler, mut dispatcher) = TokioScheduler::new(Arc::new(clock.clone()), None);

        let _ = scheduler
            .schedule(clock.now() - TimeDelta::seconds(5), expire_job("sess_1"))
            .unwrap();

        let due = tokio::time::timeout(Duration::from_millis(1), dispatcher.next_due()).await;
        assert_matches!(due, Ok(Some(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_is_journaled() {
        let clock = clock();
        let journal = Arc::new(SqliteJobJournal::new(Database::in_memory().unwrap()));
        let (scheduler, _dispatcher) = TokioScheduler::new(
            Arc::new(clock.clone()),
            Some(journal.clone() as Arc<dyn JobJournal>),
        );

        let id = scheduler
            .schedule(clock.now() + TimeDelta::seconds(60), expire_job("sess_1"))
            .unwrap();

        let pending = journal.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }

    #[tokio::test(start_paused = true)]
    async fn recover_rearms_journaled_jobs() {
        let clock = clock();
        let journal = Arc::new(SqliteJobJournal::new(Database::in_memory().unwrap()));
        journal
            .record(&ScheduledJob {
                id: JobId::from_raw("job_early"),
                due_at: clock.now() - TimeDelta::seconds(1),
                job: expire_job("sess_1"),
            })
            .unwrap();
        journal
            .record(&ScheduledJob {
                id: JobId::from_raw("job_late"),
                due_at: clock.now() + TimeDelta::seconds(30),
                job: expire_job("sess_2"),
            })
            .unwrap();

        let (scheduler, mut dispatcher) =
            TokioScheduler::new(Arc::new(clock), Some(journal as Arc<dyn JobJournal>));
        assert_eq!(scheduler.recover().unwrap(), 2);

        let first = dispatcher.next_due().await.unwrap();
        assert_eq!(first.id.as_str(), "job_early");
        let second = dispatcher.next_due().await.unwrap();
        assert_eq!(second.id.as_str(), "job_late");
    }

    #[tokio::test]
    async fn recover_without_journal_is_noop() {
        let (scheduler, _dispatcher) = TokioScheduler::new(Arc::new(clock()), None);
        assert_eq!(scheduler.recover().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_timers_and_refuses_new_jobs() {
        let clock = clock();
        let (scheduler, mut dispatcher) = TokioScheduler::new(Arc::new(clock.clone()), None);
        let _ = scheduler
            .schedule(clock.now() + TimeDelta::seconds(60), expire_job("sess_1"))
            .unwrap();

        scheduler.shutdown().await;
        assert_eq!(scheduler.pending_count(), 0);

        let fired = tokio::time::timeout(Duration::from_secs(120), dispatcher.next_due()).await;
        assert!(fired.is_err());

        let err = scheduler
            .schedule(clock.now(), expire_job("sess_1"))
            .unwrap_err();
        assert_matches!(err, ScheduleError::ShutDown);
    }
}
