//! # seatswap-store
//!
//! SQLite persistence.
//!
//! - [`Database`]: shared connection with schema bootstrap
//! - Repositories: [`SessionRepo`], [`MemberRepo`], [`UserRepo`], [`JobRepo`]
//! - Adapters implementing the core collaborator traits:
//!   [`SqliteSessionStore`], [`SqliteUserDirectory`], [`SqliteJobJournal`]

#![deny(unsafe_code)]

pub mod adapters;
pub mod database;
pub mod jobs;
pub mod members;
pub mod row_helpers;
pub mod schema;
pub mod sessions;
pub mod users;

pub use adapters::{SqliteJobJournal, SqliteSessionStore, SqliteUserDirectory};
pub use database::Database;
pub use jobs::JobRepo;
pub use members::{MemberRepo, MemberRow};
pub use seatswap_core::StoreError;
pub use sessions::SessionRepo;
pub use users::UserRepo;
