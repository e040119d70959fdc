//! Participant display names.

use chrono::Utc;
use seatswap_core::{StoreError, UserId};
use tracing::instrument;

use crate::database::Database;
use crate::row_helpers;

/// User persistence.
#[derive(Clone)]
pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    /// Wrap a database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a user or update their display name.
    #[instrument(skip(self), fields(user_id = %id))]
    pub fn upsert(&self, id: &UserId, display_name: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO users (id, display_name, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
                rusqlite::params![id.as_str(), display_name, now],
            )?;
            Ok(())
        })
    }

    /// Display name of a user, if known.
    #[instrument(skip(self), fields(user_id = %id))]
    pub fn display_name(&self, id: &UserId) -> Result<Option<String>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT display_name FROM users WHERE id = ?1")?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_helpers::get(row, 0, "users", "display_name")?)),
                None => Ok(None),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_and_lookup() {
        let repo = UserRepo::new(Database::in_memory().unwrap());
        let id = UserId::from("u1");
        repo.upsert(&id, "Ada").unwrap();
        assert_eq!(repo.display_name(&id).unwrap().as_deref(), Some("Ada"));

        repo.upsert(&id, "Ada L.").unwrap();
        assert_eq!(repo.display_name(&id).unwrap().as_deref(), Some("Ada L."));
    }

    #[test]
    fn unknown_user_is_none() {
        let repo = UserRepo::new(Database::in_memory().unwrap());
        assert_eq!(repo.display_name(&UserId::from("ghost")).unwrap(), None);
    }
}
