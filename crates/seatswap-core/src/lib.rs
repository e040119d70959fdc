//! # seatswap-core
//!
//! Foundation types for mid-session player substitution.
//!
//! - **Branded IDs**: `SessionId`, `UserId`, `JobId` as newtypes for type safety
//! - **Session model**: `Session` with its `SeatTable` (seat → occupant) and
//!   `StatSlots` (slot → statistics history)
//! - **Replacement state machine**: `ReplacementState`, eligibility, vote and
//!   quorum bookkeeping, and the commit that archives the outgoing player
//! - **Errors**: `ReplacementError` and the collaborator error types via `thiserror`
//! - **Collaborators**: `SessionStore`, `Notifier`, `DeferredJobService`,
//!   `UserDirectory`, `JobJournal` traits implemented by the outer crates

#![deny(unsafe_code)]

pub mod clock;
pub mod collaborators;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod jobs;
pub mod replacement;
pub mod session;
pub mod statistic;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{DeferredJobService, JobJournal, Notifier, SessionStore, UserDirectory};
pub use errors::{
    DirectoryError, Ineligible, NotifyError, ReplacementError, ScheduleError, StoreError,
};
pub use ids::{JobId, SessionId, UserId};
pub use jobs::{Job, ScheduledJob};
pub use replacement::{AcceptOutcome, ReplacementProposal, ReplacementState, Substitution};
pub use session::{Seat, SeatTable, Session, SessionStatus, Slot, StatSlots};
pub use statistic::PlayerStatistic;
