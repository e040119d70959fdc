//! Collaborator implementations backed by the repositories.
//!
//! SQLite calls block, so the async adapters run them on the blocking pool.

use async_trait::async_trait;
use seatswap_core::{
    DirectoryError, JobId, JobJournal, ScheduledJob, Session, SessionId, SessionStore, Slot,
    StoreError, Substitution, UserDirectory, UserId,
};

use crate::database::Database;
use crate::jobs::JobRepo;
use crate::members::MemberRepo;
use crate::sessions::SessionRepo;
use crate::users::UserRepo;

async fn blocking<F, T>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Internal(format!("store task failed: {e}")))?
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionStore
// ─────────────────────────────────────────────────────────────────────────────

/// [`SessionStore`] over SQLite.
#[derive(Clone)]
pub struct SqliteSessionStore {
    sessions: SessionRepo,
    members: MemberRepo,
}

impl SqliteSessionStore {
    /// Build on a database.
    pub fn new(db: Database) -> Self {
        Self {
            sessions: SessionRepo::new(db.clone()),
            members: MemberRepo::new(db),
        }
    }

    /// The session repository.
    pub fn sessions(&self) -> &SessionRepo {
        &self.sessions
    }

    /// The membership repository.
    pub fn members(&self) -> &MemberRepo {
        &self.members
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn read(&self, id: &SessionId) -> Result<Session, StoreError> {
        let repo = self.sessions.clone();
        let id = id.clone();
        blocking(move || repo.get(&id)).await
    }

    async fn write(&self, session: &Session) -> Result<(), StoreError> {
        let repo = self.sessions.clone();
        let session = session.clone();
        blocking(move || repo.save(&session)).await
    }

    async fn reassign_seat_owner(
        &self,
        session_id: &SessionId,
        from: Option<Slot>,
        to: Slot,
        user: &UserId,
    ) -> Result<(), StoreError> {
        let repo = self.members.clone();
        let session_id = session_id.clone();
        let user = user.clone();
        blocking(move || match from {
            Some(from) => repo.move_slot(&session_id, &user, from, to),
            None => repo.add(&session_id, &user, to),
        })
        .await
    }

    async fn commit_substitution(&self, session: &Session, sub: &Substitution) -> Result<(), StoreError> {
        let repo = self.sessions.clone();
        let session = session.clone();
        let sub = sub.clone();
        blocking(move || repo.commit_substitution(&session, &sub)).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UserDirectory
// ─────────────────────────────────────────────────────────────────────────────

/// [`UserDirectory`] over the `users` table.
#[derive(Clone)]
pub struct SqliteUserDirectory {
    users: UserRepo,
}

impl SqliteUserDirectory {
    /// Build on a database.
    pub fn new(db: Database) -> Self {
        Self {
            users: UserRepo::new(db),
        }
    }

    /// The user repository.
    pub fn users(&self) -> &UserRepo {
        &self.users
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn resolve(&self, user: &UserId) -> Result<String, DirectoryError> {
        let repo = self.users.clone();
        let id = user.clone();
        match blocking(move || repo.display_name(&id)).await {
            Ok(Some(name)) => Ok(name),
            Ok(None) => Err(DirectoryError::NotFound(user.clone())),
            Err(e) => Err(DirectoryError::Unavailable(e.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JobJournal
// ─────────────────────────────────────────────────────────────────────────────

/// [`JobJournal`] over the `scheduled_jobs` table.
#[derive(Clone)]
pub struct SqliteJobJournal {
    jobs: JobRepo,
}

impl SqliteJobJournal {
    /// Build on a database.
    pub fn new(db: Database) -> Self {
        Self {
            jobs: JobRepo::new(db),
        }
    }
}

impl JobJournal for SqliteJobJournal {
    fn record(&self, job: &ScheduledJob) -> Result<(), StoreError> {
        self.jobs.insert(job)
    }

    fn complete(&self, id: &JobId) -> Result<(), StoreError> {
        self.jobs.delete(id)
    }

    fn pending(&self) -> Result<Vec<ScheduledJob>, StoreError> {
        self.jobs.pending()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use seatswap_core::Job;

    use super::*;

    fn seeded() -> (Database, Session) {
        let db = Database::in_memory().unwrap();
        let session = Session::new(
            SessionId::new(),
            vec![UserId::from("a"), UserId::from("b")],
            Utc::now(),
        );
        SessionRepo::new(db.clone()).create(&session).unwrap();
        (db, session)
    }

    #[tokio::test]
    async fn store_read_write() {
        let (db, mut session) = seeded();
        let store = SqliteSessionStore::new(db);

        session.status = seatswap_core::SessionStatus::Finished;
        store.write(&session).await.unwrap();
        assert_eq!(store.read(&session.id).await.unwrap(), session);
    }

    #[tokio::test]
    async fn store_read_missing() {
        let store = SqliteSessionStore::new(Database::in_memory().unwrap());
        assert_matches!(
            store.read(&SessionId::from_raw("sess_nope")).await,
            Err(StoreError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn store_reassign_moves_then_adds() {
        let (db, session) = seeded();
        let store = SqliteSessionStore::new(db);

        store
            .reassign_seat_owner(&session.id, Some(Slot(0)), Slot(2), &UserId::from("a"))
            .await
            .unwrap();
        store
            .reassign_seat_owner(&session.id, None, Slot(0), &UserId::from("e"))
            .await
            .unwrap();

        let members = store.members().list(&session.id).unwrap();
        let pairs: Vec<(&str, usize)> = members
            .iter()
            .map(|m| (m.user_id.as_str(), m.slot.0))
            .collect();
        assert_eq!(pairs, vec![("e", 0), ("b", 1), ("a", 2)]);
    }

    #[tokio::test]
    async fn store_commit_substitution() {
        let (db, session) = seeded();
        let store = SqliteSessionStore::new(db);
        let mut next = session.clone();
        next.open_replacement(seatswap_core::ReplacementProposal::new(
            UserId::from("e"),
            "Eve".into(),
            seatswap_core::Seat(0),
            Utc::now(),
        ))
        .unwrap();
        let seatswap_core::AcceptOutcome::Committed(sub) = next.accept_replacement(&UserId::from("b")).unwrap() else {
            panic!("two-seat session should commit on one accept");
        };

        store.commit_substitution(&next, &sub).await.unwrap();

        assert_eq!(store.read(&session.id).await.unwrap(), next);
        let members = store.members().list(&session.id).unwrap();
        let slots: Vec<(&str, usize)> = members.iter().map(|m| (m.user_id.as_str(), m.slot.0)).collect();
        assert_eq!(slots, vec![("e", 0), ("b", 1), ("a", 2)]);
    }

    #[tokio::test]
    async fn directory_resolves_names() {
        let directory = SqliteUserDirectory::new(Database::in_memory().unwrap());
        directory.users().upsert(&UserId::from("e"), "Eve").unwrap();

        assert_eq!(directory.resolve(&UserId::from("e")).await.unwrap(), "Eve");
        assert_matches!(
            directory.resolve(&UserId::from("ghost")).await,
            Err(DirectoryError::NotFound(id)) if id.as_str() == "ghost"
        );
    }

    #[test]
    fn journal_roundtrip() {
        let journal = SqliteJobJournal::new(Database::in_memory().unwrap());
        let job = ScheduledJob {
            id: JobId::new(),
            due_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            job: Job::ExpireReplacement {
                session_id: SessionId::from_raw("sess_1"),
            },
        };
        journal.record(&job).unwrap();
        assert_eq!(journal.pending().unwrap(), vec![job.clone()]);
        journal.complete(&job.id).unwrap();
        assert!(journal.pending().unwrap().is_empty());
    }
}
