//! # seatswap-live
//!
//! Push channel to connected participants.
//!
//! Each participant connection owns a bounded outbound queue of JSON frames
//! ([`LiveEvent`]). The transport that drains the queue (WebSocket, SSE, ...)
//! lives outside this crate; dropping a connection from the registry closes
//! its queue, which is the transport's signal to hang up.
//!
//! [`ConnectionRegistry`] implements the core `Notifier` trait.

#![deny(unsafe_code)]

pub mod connection;
pub mod event;
pub mod registry;

pub use connection::{Connection, ConnectionId, SeatBinding};
pub use event::LiveEvent;
pub use registry::ConnectionRegistry;
