//! The replacement engine.
//!
//! Every entry point takes the session's lock, re-reads the session from the
//! store, applies one transition of the replacement state machine, persists
//! it, and then pushes notifications. Notification failures are logged and
//! swallowed; everything else is returned to the caller.

use std::sync::Arc;

use chrono::TimeDelta;
use seatswap_core::constants::{
    DEFAULT_IDLE_THRESHOLD_MS, DEFAULT_MAX_REPLACEMENT_MS, EVENT_REPLACEMENT_DONE,
    EVENT_SEAT_ASSIGNED,
};
use seatswap_core::{
    AcceptOutcome, Clock, DeferredJobService, Job, Notifier, NotifyError, ReplacementError,
    ReplacementProposal, ScheduleError, Seat, Session, SessionId, SessionStore, Substitution,
    SystemClock, UserDirectory, UserId,
};
use seatswap_settings::ReplacementSettings;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::error::EngineError;
use crate::locks::SessionLocks;

/// Timing of the replacement protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Idle time after which the seat on turn may be contested.
    pub idle_threshold: TimeDelta,
    /// Lifetime of a proposal.
    pub max_duration: TimeDelta,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_threshold: millis(DEFAULT_IDLE_THRESHOLD_MS),
            max_duration: millis(DEFAULT_MAX_REPLACEMENT_MS),
        }
    }
}

impl From<&ReplacementSettings> for EngineConfig {
    fn from(settings: &ReplacementSettings) -> Self {
        Self {
            idle_threshold: millis(settings.idle_threshold_ms),
            max_duration: millis(settings.max_duration_ms),
        }
    }
}

fn millis(ms: u64) -> TimeDelta {
    i64::try_from(ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Coordinates substitutions across the store, live connections and timers.
pub struct ReplacementEngine {
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    scheduler: Arc<dyn DeferredJobService>,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    locks: SessionLocks,
    config: EngineConfig,
}

impl ReplacementEngine {
    /// Create an engine on the system clock.
    pub fn new(
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        scheduler: Arc<dyn DeferredJobService>,
        directory: Arc<dyn UserDirectory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            scheduler,
            directory,
            clock: Arc::new(SystemClock),
            locks: SessionLocks::new(),
            config,
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Protocol timing in effect.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Entry points
    // ─────────────────────────────────────────────────────────────────────

    /// Whether `candidate` may start replacing `target` right now.
    #[instrument(skip_all, fields(session_id = %session_id, seat = %target, candidate = %candidate))]
    pub async fn check_eligibility(
        &self,
        session_id: &SessionId,
        target: Seat,
        candidate: &UserId,
    ) -> Result<(), EngineError> {
        let session = self.store.read(session_id).await?;
        session
            .check_eligibility(target, candidate, self.clock.now(), self.config.idle_threshold)
            .map_err(|e| EngineError::Replacement(e.into()))
    }

    /// Open a proposal for `candidate` to take over `target`.
    ///
    /// Only re-checks that no proposal is open; callers that need the full
    /// eligibility rules use [`Self::propose`].
    #[instrument(skip_all, fields(session_id = %session_id, seat = %target, candidate = %candidate))]
    pub async fn start(
        &self,
        session_id: &SessionId,
        candidate: &UserId,
        target: Seat,
    ) -> Result<ReplacementProposal, EngineError> {
        let _guard = self.locks.acquire(session_id).await;
        let result = self.start_locked(session_id, candidate, target, false).await;
        log_failure("start", &result);
        result
    }

    /// Check eligibility and open a proposal under one lock hold.
    #[instrument(skip_all, fields(session_id = %session_id, seat = %target, candidate = %candidate))]
    pub async fn propose(
        &self,
        session_id: &SessionId,
        candidate: &UserId,
        target: Seat,
    ) -> Result<ReplacementProposal, EngineError> {
        let _guard = self.locks.acquire(session_id).await;
        let result = self.start_locked(session_id, candidate, target, true).await;
        log_failure("propose", &result);
        result
    }

    /// Record an accept vote; commits the substitution on quorum.
    #[instrument(skip_all, fields(session_id = %session_id, voter = %voter))]
    pub async fn accept(&self, session_id: &SessionId, voter: &UserId) -> Result<AcceptOutcome, EngineError> {
        let _guard = self.locks.acquire(session_id).await;
        let result = self.accept_locked(session_id, voter).await;
        log_failure("accept", &result);
        result
    }

    /// Record a reject vote and cancel the proposal.
    #[instrument(skip_all, fields(session_id = %session_id, voter = %voter))]
    pub async fn reject(
        &self,
        session_id: &SessionId,
        voter: &UserId,
    ) -> Result<ReplacementProposal, EngineError> {
        let _guard = self.locks.acquire(session_id).await;
        let result = self.reject_locked(session_id, voter).await;
        log_failure("reject", &result);
        result
    }

    /// Clear the proposal if it has outlived its maximum duration.
    /// Returns whether a proposal was cleared.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn expire(&self, session_id: &SessionId) -> Result<bool, EngineError> {
        let _guard = self.locks.acquire(session_id).await;
        let result = self.expire_locked(session_id).await;
        log_failure("expire", &result);
        result
    }

    /// Run a deferred job.
    pub async fn run_job(&self, job: &Job) -> Result<(), EngineError> {
        match job {
            Job::ExpireReplacement { session_id } => self.expire(session_id).await.map(|_| ()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transitions (session lock held)
    // ─────────────────────────────────────────────────────────────────────

    async fn start_locked(
        &self,
        session_id: &SessionId,
        candidate: &UserId,
        target: Seat,
        enforce_eligibility: bool,
    ) -> Result<ReplacementProposal, EngineError> {
        let display_name = self.directory.resolve(candidate).await?;
        let mut session = self.store.read(session_id).await?;
        let now = self.clock.now();

        if enforce_eligibility {
            session
                .check_eligibility(target, candidate, now, self.config.idle_threshold)
                .map_err(ReplacementError::from)?;
        }

        let proposal = ReplacementProposal::new(candidate.clone(), display_name, target, now);
        session.open_replacement(proposal.clone())?;

        // Armed before the write: if the write fails the job finds no
        // proposal old enough and does nothing.
        let due_at = now.checked_add_signed(self.config.max_duration).ok_or_else(|| {
            ScheduleError::DueOutOfRange(format!("{now} + {}", self.config.max_duration))
        })?;
        let job_id = self.scheduler.schedule(
            due_at,
            Job::ExpireReplacement {
                session_id: session_id.clone(),
            },
        )?;
        self.store.write(&session).await?;

        info!(
            job_id = %job_id,
            display_name = %proposal.incoming_display_name,
            "replacement proposed"
        );
        notify("broadcast", self.notifier.broadcast(&session));
        Ok(proposal)
    }

    async fn accept_locked(
        &self,
        session_id: &SessionId,
        voter: &UserId,
    ) -> Result<AcceptOutcome, EngineError> {
        let mut session = self.store.read(session_id).await?;
        let outcome = session.accept_replacement(voter)?;

        match &outcome {
            AcceptOutcome::Pending { accepted, required } => {
                self.store.write(&session).await?;
                info!(accepted, required, "replacement vote recorded");
            }
            AcceptOutcome::Committed(sub) => {
                self.store.commit_substitution(&session, sub).await?;

                info!(
                    seat = %sub.target_seat,
                    outgoing = %sub.outgoing,
                    incoming = %sub.incoming,
                    archive_slot = %sub.archive_slot,
                    "replacement committed"
                );
                self.notify_commit(&session, sub);
            }
        }

        notify("broadcast", self.notifier.broadcast(&session));
        Ok(outcome)
    }

    async fn reject_locked(
        &self,
        session_id: &SessionId,
        voter: &UserId,
    ) -> Result<ReplacementProposal, EngineError> {
        let mut session = self.store.read(session_id).await?;
        let proposal = session.reject_replacement(voter)?;
        self.store.write(&session).await?;

        info!(
            rejected_by = ?proposal.rejected_by,
            accepted_by = ?proposal.accepted_by,
            candidate = %proposal.incoming_user_id,
            "replacement rejected"
        );
        notify("broadcast", self.notifier.broadcast(&session));
        Ok(proposal)
    }

    async fn expire_locked(&self, session_id: &SessionId) -> Result<bool, EngineError> {
        let mut session = self.store.read(session_id).await?;
        let Some(proposal) = session.expire_replacement(self.clock.now(), self.config.max_duration) else {
            debug!("no expired replacement");
            return Ok(false);
        };
        self.store.write(&session).await?;

        info!(
            candidate = %proposal.incoming_user_id,
            seat = %proposal.target_seat,
            votes = proposal.accepted_by.len(),
            "replacement expired"
        );
        notify("broadcast", self.notifier.broadcast(&session));
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────

    fn notify_commit(&self, session: &Session, sub: &Substitution) {
        notify("disconnect", self.notifier.disconnect(&session.id, &sub.outgoing));

        match self.notifier.bind_seat(&session.id, &sub.incoming, sub.target_seat) {
            Ok(true) => notify(
                "direct",
                self.notifier.direct(
                    &sub.incoming,
                    EVENT_SEAT_ASSIGNED,
                    json!({ "sessionId": session.id, "seat": sub.target_seat }),
                ),
            ),
            Ok(false) => debug!(user = %sub.incoming, "incoming participant not connected"),
            Err(e) => notify::<()>("bind_seat", Err(e)),
        }

        notify(
            "announce",
            self.notifier.announce(
                &session.id,
                EVENT_REPLACEMENT_DONE,
                json!({
                    "seat": sub.target_seat,
                    "userId": sub.incoming,
                    "displayName": sub.incoming_display_name,
                }),
            ),
        );
    }
}

fn notify<T>(notification: &'static str, result: Result<T, NotifyError>) {
    if let Err(e) = result {
        warn!(notification, error = %e, "failed to notify participants");
    }
}

fn log_failure<T>(operation: &'static str, result: &Result<T, EngineError>) {
    if let Err(e) = result {
        if e.is_rejection() {
            debug!(operation, kind = e.error_kind(), error = %e, "replacement call rejected");
        } else {
            error!(operation, kind = e.error_kind(), error = %e, "replacement call failed");
        }
    }
}
