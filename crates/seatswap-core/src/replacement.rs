//! The replacement state machine.
//!
//! ```text
//! Idle ──start──▶ Proposed ──accept (below quorum)──▶ Proposed
//!                    │
//!                    ├──accept (quorum)──▶ commit ──▶ Idle
//!                    ├──reject───────────────────────▶ Idle
//!                    └──expire (age > max)───────────▶ Idle
//! ```
//!
//! Every transition here is pure: it mutates a [`Session`] value and reports
//! what happened. Reading, persisting and notifying are the engine's job.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Ineligible, ReplacementError};
use crate::ids::UserId;
use crate::session::{Seat, Session, SessionStatus, Slot};

/// A pending substitution vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementProposal {
    /// Candidate taking over the seat.
    pub incoming_user_id: UserId,
    /// Candidate's display name, resolved when the proposal was opened.
    pub incoming_display_name: String,
    /// Seat being contested.
    pub target_seat: Seat,
    /// Seats that voted to accept, in vote order.
    pub accepted_by: Vec<Seat>,
    /// Seats that voted to reject.
    pub rejected_by: Vec<Seat>,
    /// When the proposal was opened.
    pub created_at: DateTime<Utc>,
}

impl ReplacementProposal {
    /// A proposal with no votes yet.
    pub fn new(
        incoming_user_id: UserId,
        incoming_display_name: String,
        target_seat: Seat,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            incoming_user_id,
            incoming_display_name,
            target_seat,
            accepted_by: Vec::new(),
            rejected_by: Vec::new(),
            created_at,
        }
    }

    /// Whether the proposal has outlived `max_duration` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, max_duration: TimeDelta) -> bool {
        now - self.created_at > max_duration
    }
}

/// Whether a session has an open proposal.
///
/// Serialized as a nullable proposal so snapshots carry
/// `activeReplacement: null | {...}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Option<ReplacementProposal>",
    into = "Option<ReplacementProposal>"
)]
pub enum ReplacementState {
    /// No proposal.
    #[default]
    Idle,
    /// A vote is in progress.
    Proposed(ReplacementProposal),
}

impl ReplacementState {
    /// Whether no proposal is open.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The open proposal.
    pub fn proposal(&self) -> Option<&ReplacementProposal> {
        match self {
            Self::Idle => None,
            Self::Proposed(p) => Some(p),
        }
    }

    /// Close the proposal, returning it.
    fn take(&mut self) -> Option<ReplacementProposal> {
        match std::mem::take(self) {
            Self::Idle => None,
            Self::Proposed(p) => Some(p),
        }
    }
}

impl From<Option<ReplacementProposal>> for ReplacementState {
    fn from(value: Option<ReplacementProposal>) -> Self {
        value.map_or(Self::Idle, Self::Proposed)
    }
}

impl From<ReplacementState> for Option<ReplacementProposal> {
    fn from(value: ReplacementState) -> Self {
        match value {
            ReplacementState::Idle => None,
            ReplacementState::Proposed(p) => Some(p),
        }
    }
}

/// A committed substitution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Substitution {
    /// Seat that changed hands.
    pub target_seat: Seat,
    /// Slot now holding the outgoing player's history.
    pub archive_slot: Slot,
    /// Player who left the seat.
    pub outgoing: UserId,
    /// Player who took the seat.
    pub incoming: UserId,
    /// Display name of the incoming player.
    pub incoming_display_name: String,
}

/// Result of a successful accept vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Vote recorded, quorum not reached yet.
    Pending {
        /// Accepting seats so far.
        accepted: usize,
        /// Accepting seats needed to commit.
        required: usize,
    },
    /// The vote completed the quorum and the substitution was applied.
    Committed(Substitution),
}

impl Session {
    /// Accepting seats needed to commit: every seat except the target.
    pub fn replacement_quorum(&self) -> usize {
        self.n_players().saturating_sub(1)
    }

    /// Whether `candidate` may start replacing `target` at `now`.
    pub fn check_eligibility(
        &self,
        target: Seat,
        candidate: &UserId,
        now: DateTime<Utc>,
        idle_threshold: TimeDelta,
    ) -> Result<(), Ineligible> {
        if self.status != SessionStatus::Running {
            return Err(Ineligible::NotRunning(self.status));
        }
        if !self.replacement.is_idle() {
            return Err(Ineligible::ReplacementInProgress);
        }
        if target != self.active_seat {
            return Err(Ineligible::NotOnTurn {
                target,
                active: self.active_seat,
            });
        }
        let idle = now - self.last_activity_at;
        if idle <= idle_threshold {
            return Err(Ineligible::NotIdle {
                idle_ms: idle.num_milliseconds(),
            });
        }
        if self.seats.is_seated(candidate) {
            return Err(Ineligible::CandidateSeated(candidate.clone()));
        }
        Ok(())
    }

    /// Attach a new proposal.
    pub fn open_replacement(&mut self, proposal: ReplacementProposal) -> Result<(), ReplacementError> {
        if !self.replacement.is_idle() {
            return Err(ReplacementError::AlreadyActive);
        }
        if !self.seats.contains(proposal.target_seat) {
            return Err(ReplacementError::InvalidSeat {
                seat: proposal.target_seat,
                n_players: self.n_players(),
            });
        }
        self.replacement = ReplacementState::Proposed(proposal);
        Ok(())
    }

    /// Record `voter`'s accept vote; commits when it completes the quorum.
    ///
    /// On error the session is left untouched.
    pub fn accept_replacement(&mut self, voter: &UserId) -> Result<AcceptOutcome, ReplacementError> {
        let required = self.replacement_quorum();
        let ReplacementState::Proposed(proposal) = &mut self.replacement else {
            return Err(ReplacementError::NoActiveReplacement);
        };
        let seat = self
            .seats
            .seat_of(voter)
            .ok_or_else(|| ReplacementError::NotSeated(voter.clone()))?;
        if proposal.accepted_by.contains(&seat) {
            return Err(ReplacementError::AlreadyAccepted(seat));
        }
        if seat == proposal.target_seat {
            return Err(ReplacementError::CannotAcceptOwnReplacement(seat));
        }

        let accepted = proposal.accepted_by.len() + 1;
        if accepted < required {
            proposal.accepted_by.push(seat);
            return Ok(AcceptOutcome::Pending { accepted, required });
        }

        if !self.seats.contains(proposal.target_seat) {
            return Err(ReplacementError::CorruptProposal(format!(
                "target seat {} does not exist in a {}-seat session",
                proposal.target_seat,
                self.seats.len()
            )));
        }
        if self.stat_slots.len() < self.seats.len() {
            return Err(ReplacementError::CorruptProposal(format!(
                "{} stat slots for {} seats",
                self.stat_slots.len(),
                self.seats.len()
            )));
        }
        proposal.accepted_by.push(seat);
        let proposal = self
            .replacement
            .take()
            .ok_or(ReplacementError::NoActiveReplacement)?;
        self.commit_replacement(proposal).map(AcceptOutcome::Committed)
    }

    /// Apply a closed proposal: seat the incoming player and archive the
    /// outgoing history.
    fn commit_replacement(&mut self, proposal: ReplacementProposal) -> Result<Substitution, ReplacementError> {
        let target = proposal.target_seat;
        let outgoing = self
            .seats
            .reassign(target, proposal.incoming_user_id.clone())
            .ok_or_else(|| ReplacementError::CorruptProposal(format!("target seat {target} vanished")))?;
        self.replaced_seat_history.push(target);
        let archive_slot = self.stat_slots.archive(target);

        Ok(Substitution {
            target_seat: target,
            archive_slot,
            outgoing,
            incoming: proposal.incoming_user_id,
            incoming_display_name: proposal.incoming_display_name,
        })
    }

    /// Record `voter`'s reject vote and cancel the proposal.
    pub fn reject_replacement(&mut self, voter: &UserId) -> Result<ReplacementProposal, ReplacementError> {
        let ReplacementState::Proposed(proposal) = &mut self.replacement else {
            return Err(ReplacementError::NoActiveReplacement);
        };
        let seat = self
            .seats
            .seat_of(voter)
            .ok_or_else(|| ReplacementError::NotSeated(voter.clone()))?;
        proposal.rejected_by.push(seat);
        self.replacement
            .take()
            .ok_or(ReplacementError::NoActiveReplacement)
    }

    /// Drop the open proposal if it is older than `max_duration` at `now`.
    pub fn expire_replacement(
        &mut self,
        now: DateTime<Utc>,
        max_duration: TimeDelta,
    ) -> Option<ReplacementProposal> {
        let expired = self
            .replacement
            .proposal()
            .is_some_and(|p| p.is_expired(now, max_duration));
        if expired { self.replacement.take() } else { None }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
