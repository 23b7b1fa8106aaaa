//! CRUD and search operations for [`Note`] records.
//!
//! Every operation here is ownership-scoped: the acting user's id is part of
//! each `WHERE` clause, so a note owned by another user behaves exactly like
//! a note that does not exist.

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Note;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new note.
    ///
    /// The folder reference, if any, is stored as given; it is not checked
    /// against the folder table or the folder's owner.
    pub fn create_note(&self, note: &Note) -> Result<()> {
        self.conn().execute(
            "INSERT INTO notes (id, title, content, user_id, folder_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                note.id.to_string(),
                note.title,
                note.content,
                note.user_id.to_string(),
                note.folder_id.map(|f| f.to_string()),
                note.created_at.to_rfc3339(),
                note.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single note owned by `user_id`.
    ///
    /// Both a nonexistent id and an id owned by someone else return
    /// [`StoreError::NotFound`].
    pub fn get_note(&self, user_id: Uuid, id: Uuid) -> Result<Note> {
        self.conn()
            .query_row(
                "SELECT id, title, content, user_id, folder_id, created_at, updated_at
                 FROM notes
                 WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
                row_to_note,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List the notes owned by `user_id`, most recently edited first.
    ///
    /// With a folder filter the listing is additionally restricted to that
    /// folder id.  The filter value itself is not checked against the folder
    /// table or its owner; an id that matches nothing yields an empty list.
    pub fn list_notes(&self, user_id: Uuid, folder_id: Option<Uuid>) -> Result<Vec<Note>> {
        let mut notes = Vec::new();

        match folder_id {
            Some(folder_id) => {
                let mut stmt = self.conn().prepare(
                    "SELECT id, title, content, user_id, folder_id, created_at, updated_at
                     FROM notes
                     WHERE user_id = ?1 AND folder_id = ?2
                     ORDER BY updated_at DESC",
                )?;
                let rows = stmt.query_map(
                    params![user_id.to_string(), folder_id.to_string()],
                    row_to_note,
                )?;
                for row in rows {
                    notes.push(row?);
                }
            }
            None => {
                let mut stmt = self.conn().prepare(
                    "SELECT id, title, content, user_id, folder_id, created_at, updated_at
                     FROM notes
                     WHERE user_id = ?1
                     ORDER BY updated_at DESC",
                )?;
                let rows = stmt.query_map(params![user_id.to_string()], row_to_note)?;
                for row in rows {
                    notes.push(row?);
                }
            }
        }

        Ok(notes)
    }

    /// Return the notes owned by `user_id` whose title or content matches
    /// the given pattern, most recently edited first.
    ///
    /// The pattern is compiled by the caller (typically case-insensitive);
    /// matching happens in process after the ownership-scoped fetch.
    pub fn search_notes(&self, user_id: Uuid, pattern: &Regex) -> Result<Vec<Note>> {
        let notes = self.list_notes(user_id, None)?;
        Ok(notes
            .into_iter()
            .filter(|n| pattern.is_match(&n.title) || pattern.is_match(&n.content))
            .collect())
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update title, content and folder of a note owned by `user_id`, and
    /// refresh its `updated_at` timestamp.
    ///
    /// The folder is set to the given value, or cleared to "Uncategorized"
    /// when `None`.  Fails with [`StoreError::NotFound`] under the same
    /// ownership rule as [`Database::get_note`].
    pub fn update_note(
        &self,
        user_id: Uuid,
        id: Uuid,
        title: &str,
        content: &str,
        folder_id: Option<Uuid>,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE notes
             SET title = ?3, content = ?4, folder_id = ?5, updated_at = ?6
             WHERE id = ?1 AND user_id = ?2",
            params![
                id.to_string(),
                user_id.to_string(),
                title,
                content,
                folder_id.map(|f| f.to_string()),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a note owned by `user_id`.  Returns `true` if a row was
    /// deleted; absent or foreign ids delete nothing and that is not an
    /// error.
    pub fn delete_note(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM notes WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Delete every note owned by a user.  Returns the number of rows
    /// removed.  Used by the admin account-deletion cascade.
    pub fn delete_notes_for_user(&self, user_id: Uuid) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM notes WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Note`].
fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    let id_str: String = row.get(0)?;
    let title: String = row.get(1)?;
    let content: String = row.get(2)?;
    let user_id_str: String = row.get(3)?;
    let folder_id_str: Option<String> = row.get(4)?;
    let created_str: String = row.get(5)?;
    let updated_str: String = row.get(6)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let user_id = Uuid::parse_str(&user_id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let folder_id = folder_id_str
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let updated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&updated_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Note {
        id,
        title,
        content,
        user_id,
        folder_id,
        created_at,
        updated_at,
    })
}
