//! # seatswap-engine
//!
//! Mid-session player substitution.
//!
//! - [`ReplacementEngine`]: `start` / `accept` / `reject` / `expire` under a
//!   per-session lock, persisting through `SessionStore` and pushing through
//!   `Notifier`
//! - [`SessionLocks`]: the per-session lock table
//! - [`TokioScheduler`] and [`JobDispatcher`]: expiry timers, optionally
//!   journaled
//! - [`Runtime`]: SQLite store, live registry, scheduler and engine wired
//!   from `SeatswapSettings`

#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod locks;
pub mod runtime;
pub mod scheduler;

pub use engine::{EngineConfig, ReplacementEngine};
pub use error::EngineError;
pub use locks::{SessionLockGuard, SessionLocks};
pub use runtime::Runtime;
pub use scheduler::{JobDispatcher, TokioScheduler};
