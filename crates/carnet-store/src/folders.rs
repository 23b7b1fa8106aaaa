//! CRUD operations for [`Folder`] records.
//!
//! Listing and renaming are ownership-scoped: the acting user's id is part
//! of the SQL filter, so operations against another user's folder match
//! zero rows.  [`Database::get_folder`] alone is unscoped -- it backs the
//! active-folder name shown on the dashboard, which resolves any existing
//! folder id regardless of owner.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Folder;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new folder.
    pub fn create_folder(&self, folder: &Folder) -> Result<()> {
        self.conn().execute(
            "INSERT INTO folders (id, name, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                folder.id.to_string(),
                folder.name,
                folder.user_id.to_string(),
                folder.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single folder by UUID, regardless of owner.
    pub fn get_folder(&self, id: Uuid) -> Result<Folder> {
        self.conn()
            .query_row(
                "SELECT id, name, user_id, created_at
                 FROM folders
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_folder,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List the folders owned by a user, oldest first.
    pub fn list_folders(&self, user_id: Uuid) -> Result<Vec<Folder>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, user_id, created_at
             FROM folders
             WHERE user_id = ?1
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], row_to_folder)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Rename a folder owned by `user_id`.
    ///
    /// A folder id that does not exist, or that belongs to another user,
    /// matches zero rows; that is silently accepted, not an error.
    pub fn rename_folder(&self, user_id: Uuid, folder_id: Uuid, new_name: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE folders SET name = ?3 WHERE id = ?1 AND user_id = ?2",
            params![folder_id.to_string(), user_id.to_string(), new_name],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete every folder owned by a user.  Returns the number of rows
    /// removed.  Used by the admin account-deletion cascade.
    pub fn delete_folders_for_user(&self, user_id: Uuid) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM folders WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Folder`].
fn row_to_folder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Folder> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let user_id_str: String = row.get(2)?;
    let created_str: String = row.get(3)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let user_id = Uuid::parse_str(&user_id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Folder {
        id,
        name,
        user_id,
        created_at,
    })
}
