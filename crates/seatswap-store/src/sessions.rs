//! Session rows: status plus the full session state as JSON.

use chrono::Utc;
use seatswap_core::{Session, SessionId, SessionStatus, Slot, StoreError, Substitution};
use tracing::instrument;

use crate::database::Database;
use crate::members::{insert_member, move_member};
use crate::row_helpers;

/// Session persistence.
#[derive(Clone)]
pub struct SessionRepo {
    db: Database,
}

impl SessionRepo {
    /// Wrap a database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new session and one membership per seat.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn create(&self, session: &Session) -> Result<(), StoreError> {
        let state = serde_json::to_string(session)?;
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let _ = tx.execute(
                "INSERT INTO sessions (id, status, state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![session.id.as_str(), session.status.to_string(), state, now],
            )?;
            for (seat, user) in session.seats.iter() {
                let _ = tx.execute(
                    "INSERT INTO session_members (session_id, user_id, player_index)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![
                        session.id.as_str(),
                        user.as_str(),
                        row_helpers::index_to_sql(seat.0)
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Load a session. `NotFound` if it does not exist.
    #[instrument(skip(self), fields(session_id = %id))]
    pub fn get(&self, id: &SessionId) -> Result<Session, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT status, state FROM sessions WHERE id = ?1")?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_session(row),
                None => Err(StoreError::NotFound(id.clone())),
            }
        })
    }

    /// Overwrite a session's stored state. `NotFound` if it does not exist.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        let state = serde_json::to_string(session)?;
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| update_session(conn, session, &state, &now))
    }

    /// Persist a committed substitution: archive the outgoing membership,
    /// seat the incoming one and save the session, in one transaction.
    #[instrument(skip(self, session, sub), fields(session_id = %session.id, seat = %sub.target_seat))]
    pub fn commit_substitution(&self, session: &Session, sub: &Substitution) -> Result<(), StoreError> {
        let state = serde_json::to_string(session)?;
        let now = Utc::now().to_rfc3339();
        let seat_slot = Slot::of_seat(sub.target_seat);

        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            move_member(&tx, &session.id, &sub.outgoing, seat_slot, sub.archive_slot)?;
            insert_member(&tx, &session.id, &sub.incoming, seat_slot)?;
            update_session(&tx, session, &state, &now)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Ids of sessions in a given status.
    #[instrument(skip(self))]
    pub fn list_ids(&self, status: SessionStatus) -> Result<Vec<SessionId>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM sessions WHERE status = ?1 ORDER BY created_at")?;
            let mut rows = stmt.query([status.to_string()])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(SessionId::from_raw(row_helpers::get::<String>(row, 0, "sessions", "id")?));
            }
            Ok(ids)
        })
    }

    /// Delete a session and its memberships.
    #[instrument(skip(self), fields(session_id = %id))]
    pub fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let _ = conn.execute("DELETE FROM sessions WHERE id = ?1", [id.as_str()])?;
            Ok(())
        })
    }
}

fn update_session(
    conn: &rusqlite::Connection,
    session: &Session,
    state: &str,
    now: &str,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE sessions SET status = ?1, state = ?2, updated_at = ?3 WHERE id = ?4",
        rusqlite::params![session.status.to_string(), state, now, session.id.as_str()],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(session.id.clone()));
    }
    Ok(())
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<Session, StoreError> {
    let status_str: String = row_helpers::get(row, 0, "sessions", "status")?;
    let state: String = row_helpers::get(row, 1, "sessions", "state")?;

    let status: SessionStatus = row_helpers::parse_enum(&status_str, "sessions", "status")?;
    let session: Session = row_helpers::parse_json(&state, "sessions", "state")?;
    if session.status != status {
        return Err(StoreError::CorruptRow {
            table: "sessions",
            column: "status",
            detail: format!("column says {status}, state says {}", session.status),
        });
    }
    if session.stat_slots.len() < session.n_players() {
        return Err(StoreError::CorruptRow {
            table: "sessions",
            column: "state",
            detail: format!(
                "{} statistics for {} seats",
                session.stat_slots.len(),
                session.n_players()
            ),
        });
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use seatswap_core::{AcceptOutcome, ReplacementProposal, ReplacementState, Seat, UserId};

    use super::*;
    use crate::members::{MemberRepo, MemberRow};

    fn session() -> Session {
        Session::new(
            SessionId::new(),
            vec![UserId::from("alice"), UserId::from("bob")],
            Utc::now(),
        )
    }

    #[test]
    fn create_and_get() {
        let repo = SessionRepo::new(Database::in_memory().unwrap());
        let s = session();
        repo.create(&s).unwrap();
        assert_eq!(repo.get(&s.id).unwrap(), s);
    }

    #[test]
    fn get_nonexistent_is_not_found() {
        let repo = SessionRepo::new(Database::in_memory().unwrap());
        let id = SessionId::from_raw("sess_missing");
        assert_matches!(repo.get(&id), Err(StoreError::NotFound(missing)) if missing == id);
    }

    #[test]
    fn save_overwrites_state() {
        let repo = SessionRepo::new(Database::in_memory().unwrap());
        let mut s = session();
        repo.create(&s).unwrap();

        s.replacement = ReplacementState::Proposed(ReplacementProposal::new(
            UserId::from("carol"),
            "Carol".into(),
            Seat(0),
            Utc::now(),
        ));
        repo.save(&s).unwrap();

        let loaded = repo.get(&s.id).unwrap();
        assert_eq!(loaded.replacement.proposal().unwrap().incoming_user_id, UserId::from("carol"));
    }

    #[test]
    fn save_unknown_session_is_not_found() {
        let repo = SessionRepo::new(Database::in_memory().unwrap());
        assert_matches!(repo.save(&session()), Err(StoreError::NotFound(_)));
    }

    #[test]
    fn corrupt_state_is_reported() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO sessions (id, status, state, created_at, updated_at)
                 VALUES ('sess_bad', 'running', '{not json', 'now', 'now')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let repo = SessionRepo::new(db);
        assert_matches!(
            repo.get(&SessionId::from_raw("sess_bad")),
            Err(StoreError::CorruptRow { table: "sessions", column: "state", .. })
        );
    }

    /// `session` after carol's proposal for seat 0 commits, with the substitution.
    fn committed(session: &Session) -> (Session, Substitution) {
        let mut next = session.clone();
        next.open_replacement(ReplacementProposal::new(
            UserId::from("carol"),
            "Carol".into(),
            Seat(0),
            Utc::now(),
        ))
        .unwrap();
        let AcceptOutcome::Committed(sub) = next.accept_replacement(&UserId::from("bob")).unwrap() else {
            panic!("two-seat session should commit on one accept");
        };
        (next, sub)
    }

    fn member_pairs(db: &Database, id: &SessionId) -> Vec<(String, usize)> {
        MemberRepo::new(db.clone())
            .list(id)
            .unwrap()
            .into_iter()
            .map(|MemberRow { user_id, slot }| (user_id.as_str().to_owned(), slot.0))
            .collect()
    }

    #[test]
    fn commit_substitution_rewrites_members_and_state() {
        let db = Database::in_memory().unwrap();
        let repo = SessionRepo::new(db.clone());
        let s = session();
        repo.create(&s).unwrap();
        let (next, sub) = committed(&s);

        repo.commit_substitution(&next, &sub).unwrap();

        assert_eq!(repo.get(&s.id).unwrap(), next);
        assert_eq!(
            member_pairs(&db, &s.id),
            vec![("carol".into(), 0), ("bob".into(), 1), ("alice".into(), 2)]
        );
    }

    #[test]
    fn failed_commit_substitution_applies_nothing() {
        let db = Database::in_memory().unwrap();
        let repo = SessionRepo::new(db.clone());
        let s = session();
        repo.create(&s).unwrap();
        let (next, sub) = committed(&s);

        // The archive move succeeds; the insert of the incoming member fails.
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER fail_member_insert BEFORE INSERT ON session_members
                 BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        assert_matches!(repo.commit_substitution(&next, &sub), Err(StoreError::Database(_)));
        assert_eq!(repo.get(&s.id).unwrap(), s);
        assert_eq!(member_pairs(&db, &s.id), vec![("alice".into(), 0), ("bob".into(), 1)]);

        db.with_conn(|conn| {
            conn.execute_batch("DROP TRIGGER fail_member_insert")?;
            Ok(())
        })
        .unwrap();
        repo.commit_substitution(&next, &sub).unwrap();
        assert_eq!(repo.get(&s.id).unwrap(), next);
    }

    #[test]
    fn short_statistics_are_reported() {
        let db = Database::in_memory().unwrap();
        let repo = SessionRepo::new(db.clone());
        let s = session();
        repo.create(&s).unwrap();
        db.with_conn(|conn| {
            let _ = conn.execute(
                "UPDATE sessions SET state = json_set(state, '$.statistics', json('[]')) WHERE id = ?1",
                [s.id.as_str()],
            )?;
            Ok(())
        })
        .unwrap();

        assert_matches!(
            repo.get(&s.id),
            Err(StoreError::CorruptRow { table: "sessions", column: "state", .. })
        );
    }

    #[test]
    fn list_by_status() {
        let repo = SessionRepo::new(Database::in_memory().unwrap());
        let running = session();
        let mut finished = session();
        finished.status = SessionStatus::Finished;
        repo.create(&running).unwrap();
        repo.create(&finished).unwrap();

        assert_eq!(repo.list_ids(SessionStatus::Running).unwrap(), vec![running.id]);
        assert_eq!(repo.list_ids(SessionStatus::Finished).unwrap(), vec![finished.id]);
    }

    #[test]
    fn delete_removes_session() {
        let repo = SessionRepo::new(Database::in_memory().unwrap());
        let s = session();
        repo.create(&s).unwrap();
        repo.delete(&s.id).unwrap();
        assert_matches!(repo.get(&s.id), Err(StoreError::NotFound(_)));
    }
}
