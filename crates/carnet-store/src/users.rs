//! CRUD operations for [`User`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user.
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, username, password_hash, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.is_admin,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by UUID.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, password_hash, is_admin, created_at
                 FROM users
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a single user by exact (case-sensitive) username.
    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, password_hash, is_admin, created_at
                 FROM users
                 WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Whether a user with this exact username already exists.
    pub fn username_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Total number of registered users.
    pub fn count_users(&self) -> Result<i64> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    /// List all users, oldest registration first.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, username, password_hash, is_admin, created_at
             FROM users
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map([], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Set the admin flag on a user.  Returns `true` if a row was updated.
    pub fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET is_admin = ?2 WHERE id = ?1",
            params![id.to_string(), is_admin],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a user record by UUID.  Returns `true` if a row was deleted.
    ///
    /// This removes only the user row itself; callers deleting an account
    /// must remove the user's notes and folders first (see
    /// [`Database::delete_notes_for_user`] and
    /// [`Database::delete_folders_for_user`]).
    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let username: String = row.get(1)?;
    let password_hash: String = row.get(2)?;
    let is_admin: bool = row.get(3)?;
    let created_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(User {
        id,
        username,
        password_hash,
        is_admin,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn sample_user(username: &str, is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            is_admin,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_get_round_trip() {
        let (_dir, db) = open_test_db();
        let user = sample_user("alice", true);

        db.create_user(&user).unwrap();

        let fetched = db.get_user(user.id).unwrap();
        assert_eq!(fetched.username, "alice");
        assert!(fetched.is_admin);

        let by_name = db.get_user_by_username("alice").unwrap();
        assert_eq!(by_name.id, user.id);
    }

    #[test]
    fn username_lookup_is_case_sensitive() {
        let (_dir, db) = open_test_db();
        db.create_user(&sample_user("Alice", false)).unwrap();

        assert!(db.username_exists("Alice").unwrap());
        assert!(!db.username_exists("alice").unwrap());
        assert!(matches!(
            db.get_user_by_username("alice"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn count_tracks_registrations() {
        let (_dir, db) = open_test_db();
        assert_eq!(db.count_users().unwrap(), 0);

        db.create_user(&sample_user("alice", true)).unwrap();
        db.create_user(&sample_user("bob", false)).unwrap();
        assert_eq!(db.count_users().unwrap(), 2);
    }

    #[test]
    fn set_admin_flips_flag() {
        let (_dir, db) = open_test_db();
        let user = sample_user("bob", false);
        db.create_user(&user).unwrap();

        assert!(db.set_admin(user.id, true).unwrap());
        assert!(db.get_user(user.id).unwrap().is_admin);

        // Unknown id updates nothing.
        assert!(!db.set_admin(Uuid::new_v4(), true).unwrap());
    }

    #[test]
    fn delete_user_removes_record() {
        let (_dir, db) = open_test_db();
        let user = sample_user("bob", false);
        db.create_user(&user).unwrap();

        assert!(db.delete_user(user.id).unwrap());
        assert!(matches!(db.get_user(user.id), Err(StoreError::NotFound)));
        assert!(!db.delete_user(user.id).unwrap());
    }
}
