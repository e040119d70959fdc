//! Session state.
//!
//! A session keeps two parallel indices:
//!
//! - [`SeatTable`]: seat → current occupant. Fixed length for the lifetime of
//!   the session; turn order and board ownership refer to seats.
//! - [`StatSlots`]: slot → statistics of one player instance. Starts with one
//!   slot per seat and grows by one archival slot per committed substitution.
//!
//! Slot `n` for `n < n_players` always holds the record of whoever currently
//! sits in seat `n`. Slots past `n_players` hold the histories of players who
//! were substituted out.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{SessionId, UserId};
use crate::replacement::ReplacementState;
use crate::statistic::PlayerStatistic;

/// A fixed position in turn order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seat(pub usize);

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into [`StatSlots`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub usize);

impl Slot {
    /// The slot bound to a seat.
    pub fn of_seat(seat: Seat) -> Self {
        Self(seat.0)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a session. Only `Running` sessions accept substitutions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for players.
    Pending,
    /// In play.
    Running,
    /// Over.
    Finished,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SeatTable
// ─────────────────────────────────────────────────────────────────────────────

/// Seat → current occupant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatTable(Vec<UserId>);

impl SeatTable {
    /// Seat the given users in order.
    pub fn new(occupants: Vec<UserId>) -> Self {
        Self(occupants)
    }

    /// Number of seats (`n_players`).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no seats.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `seat` exists.
    pub fn contains(&self, seat: Seat) -> bool {
        seat.0 < self.0.len()
    }

    /// Occupant of a seat.
    pub fn occupant(&self, seat: Seat) -> Option<&UserId> {
        self.0.get(seat.0)
    }

    /// Seat held by a user, if any.
    pub fn seat_of(&self, user: &UserId) -> Option<Seat> {
        self.0.iter().position(|u| u == user).map(Seat)
    }

    /// Whether the user holds any seat.
    pub fn is_seated(&self, user: &UserId) -> bool {
        self.seat_of(user).is_some()
    }

    /// Put `user` into `seat`, returning the previous occupant.
    pub(crate) fn reassign(&mut self, seat: Seat, user: UserId) -> Option<UserId> {
        self.0
            .get_mut(seat.0)
            .map(|slot| std::mem::replace(slot, user))
    }

    /// Occupants in seat order.
    pub fn iter(&self) -> impl Iterator<Item = (Seat, &UserId)> {
        self.0.iter().enumerate().map(|(i, u)| (Seat(i), u))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StatSlots
// ─────────────────────────────────────────────────────────────────────────────

/// Slot → statistics history of one player instance. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatSlots(Vec<PlayerStatistic>);

impl StatSlots {
    /// One fresh slot per seat.
    pub fn for_players(n_players: usize) -> Self {
        Self(vec![PlayerStatistic::fresh(); n_players])
    }

    /// Rebuild from persisted records.
    pub fn from_records(records: Vec<PlayerStatistic>) -> Self {
        Self(records)
    }

    /// Number of slots, seat-bound and archival.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Record at a slot.
    pub fn get(&self, slot: Slot) -> Option<&PlayerStatistic> {
        self.0.get(slot.0)
    }

    /// Mutable record at the slot bound to a seat, for the turn engine.
    pub fn seat_record_mut(&mut self, seat: Seat) -> Option<&mut PlayerStatistic> {
        self.0.get_mut(seat.0)
    }

    /// Move the history bound to `seat` into a new archival slot and leave a
    /// fresh record at the seat. Returns the archival slot.
    ///
    /// The caller guarantees `seat` is a valid seat.
    pub(crate) fn archive(&mut self, seat: Seat) -> Slot {
        let archive = Slot(self.0.len());
        self.0.push(PlayerStatistic::fresh());
        self.0.swap(archive.0, seat.0);
        archive
    }

    /// All records in slot order.
    pub fn records(&self) -> &[PlayerStatistic] {
        &self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Full state of one game instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Seat → occupant.
    pub seats: SeatTable,
    /// Seat whose turn it is.
    pub active_seat: Seat,
    /// Time of the last accepted move.
    pub last_activity_at: DateTime<Utc>,
    /// Slot → statistics history.
    #[serde(rename = "statistics")]
    pub stat_slots: StatSlots,
    /// Seats that have been vacated by a substitution, in order.
    pub replaced_seat_history: Vec<Seat>,
    /// The open replacement proposal, if any.
    #[serde(rename = "activeReplacement", default)]
    pub replacement: ReplacementState,
}

impl Session {
    /// A running session with the given players seated in order, seat 0 on turn.
    pub fn new(id: SessionId, players: Vec<UserId>, now: DateTime<Utc>) -> Self {
        let n_players = players.len();
        Self {
            id,
            status: SessionStatus::Running,
            seats: SeatTable::new(players),
            active_seat: Seat(0),
            last_activity_at: now,
            stat_slots: StatSlots::for_players(n_players),
            replaced_seat_history: Vec::new(),
            replacement: ReplacementState::Idle,
        }
    }

    /// Number of seats.
    pub fn n_players(&self) -> usize {
        self.seats.len()
    }

    /// Record an accepted move by the seat on turn.
    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Hand the turn to `seat`.
    pub fn advance_turn(&mut self, seat: Seat, now: DateTime<Utc>) {
        self.active_seat = seat;
        self.last_activity_at = now;
    }
}
