//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the view layer as structured data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Login name.  Uniqueness is enforced by an existence check at
    /// registration time, not by the schema.
    pub username: String,
    /// Argon2id hash of the password, in PHC string format.
    pub password_hash: String,
    /// Whether this account may use the admin operations.  The first account
    /// ever registered gets this implicitly.
    pub is_admin: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Folder
// ---------------------------------------------------------------------------

/// A named grouping of notes, owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: Uuid,
    /// Display name.  Not required to be unique.
    pub name: String,
    /// The owning user.
    pub user_id: Uuid,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Note
// ---------------------------------------------------------------------------

/// A single note.  Content is markdown source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Unique note identifier.
    pub id: Uuid,
    /// Title line shown in listings.
    pub title: String,
    /// Markdown source text.
    pub content: String,
    /// The owning user.  Immutable after creation.
    pub user_id: Uuid,
    /// The folder this note is filed under; `None` means "Uncategorized".
    pub folder_id: Option<Uuid>,
    /// When the note was created.
    pub created_at: DateTime<Utc>,
    /// When the note was last edited.  Equal to `created_at` until the first
    /// edit, refreshed on every edit after that.
    pub updated_at: DateTime<Utc>,
}
