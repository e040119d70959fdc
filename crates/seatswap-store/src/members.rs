//! Session memberships: which user holds which stat slot of a session.
//!
//! Seat-bound slots (`player_index < n_players`) name the current occupant;
//! archival slots name players who were substituted out.

use seatswap_core::{SessionId, Slot, StoreError, UserId};
use tracing::instrument;

use crate::database::Database;
use crate::row_helpers;

/// One membership row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRow {
    /// Member.
    pub user_id: UserId,
    /// Slot the member's statistics live in.
    pub slot: Slot,
}

/// Membership persistence.
#[derive(Clone)]
pub struct MemberRepo {
    db: Database,
}

impl MemberRepo {
    /// Wrap a database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add a membership at `slot`.
    #[instrument(skip(self), fields(session_id = %session_id, user_id = %user, slot = %slot))]
    pub fn add(&self, session_id: &SessionId, user: &UserId, slot: Slot) -> Result<(), StoreError> {
        self.db.with_conn(|conn| insert_member(conn, session_id, user, slot))
    }

    /// Move `user`'s membership from slot `from` to slot `to`.
    #[instrument(skip(self), fields(session_id = %session_id, user_id = %user, from = %from, to = %to))]
    pub fn move_slot(
        &self,
        session_id: &SessionId,
        user: &UserId,
        from: Slot,
        to: Slot,
    ) -> Result<(), StoreError> {
        self.db.with_conn(|conn| move_member(conn, session_id, user, from, to))
    }

    /// All memberships of a session, in slot order.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn list(&self, session_id: &SessionId) -> Result<Vec<MemberRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, player_index FROM session_members
                 WHERE session_id = ?1 ORDER BY player_index",
            )?;
            let mut rows = stmt.query([session_id.as_str()])?;
            let mut members = Vec::new();
            while let Some(row) = rows.next()? {
                let user: String = row_helpers::get(row, 0, "session_members", "user_id")?;
                let index: i64 = row_helpers::get(row, 1, "session_members", "player_index")?;
                members.push(MemberRow {
                    user_id: UserId::from_raw(user),
                    slot: Slot(row_helpers::index_from_sql(index, "session_members", "player_index")?),
                });
            }
            Ok(members)
        })
    }

    /// Sessions a user has ever been a member of.
    #[instrument(skip(self), fields(user_id = %user))]
    pub fn sessions_of(&self, user: &UserId) -> Result<Vec<SessionId>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT session_id FROM session_members WHERE user_id = ?1 ORDER BY session_id",
            )?;
            let mut rows = stmt.query([user.as_str()])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                let id: String = row_helpers::get(row, 0, "session_members", "session_id")?;
                ids.push(SessionId::from_raw(id));
            }
            Ok(ids)
        })
    }
}

pub(crate) fn insert_member(
    conn: &rusqlite::Connection,
    session_id: &SessionId,
    user: &UserId,
    slot: Slot,
) -> Result<(), StoreError> {
    let _ = conn.execute(
        "INSERT INTO session_members (session_id, user_id, player_index) VALUES (?1, ?2, ?3)",
        rusqlite::params![session_id.as_str(), user.as_str(), row_helpers::index_to_sql(slot.0)],
    )?;
    Ok(())
}

pub(crate) fn move_member(
    conn: &rusqlite::Connection,
    session_id: &SessionId,
    user: &UserId,
    from: Slot,
    to: Slot,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE session_members SET player_index = ?1
         WHERE session_id = ?2 AND user_id = ?3 AND player_index = ?4",
        rusqlite::params![
            row_helpers::index_to_sql(to.0),
            session_id.as_str(),
            user.as_str(),
            row_helpers::index_to_sql(from.0),
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::Database(format!(
            "no membership of {user} at slot {from} in {session_id}"
        )));
    }
    Ok(())
}
