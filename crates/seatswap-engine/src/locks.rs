//! Per-session mutual exclusion.
//!
//! Every engine entry point holds its session's lock across
//! read → mutate → persist → notify. Locks for different sessions are
//! independent. Entries are dropped from the map once no task holds or
//! waits on them.

use std::sync::Arc;

use dashmap::DashMap;
use seatswap_core::SessionId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock table keyed by session.
#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<DashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a session.
    pub async fn acquire(&self, session_id: &SessionId) -> SessionLockGuard {
        let mutex = Arc::clone(self.locks.entry(session_id.clone()).or_default().value());
        let guard = mutex.lock_owned().await;
        SessionLockGuard {
            guard: Some(guard),
            session_id: session_id.clone(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of sessions with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no session is locked or awaited.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one session. Released on drop.
pub struct SessionLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    session_id: SessionId,
    locks: Arc<DashMap<SessionId, Arc<Mutex<()>>>>,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own handle left: nobody holds or waits on it.
        let _ = self
            .locks
            .remove_if(&self.session_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
