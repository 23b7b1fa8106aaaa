//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `users`, `folders`, and `notes`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
///
/// The tables deliberately carry no foreign keys.  `notes.folder_id` may
/// point at a folder id that no longer resolves, or that belongs to a
/// different user, and the application treats both the same as
/// "Uncategorized" at render time.  Account deletion removes a user's
/// notes, folders and user record in three explicit steps, so a partial
/// failure can leave orphaned rows; schema-level cascades would mask that
/// contract.  Every folder/note query is filtered by `user_id` instead.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    username      TEXT NOT NULL,
    password_hash TEXT NOT NULL,              -- argon2id PHC string
    is_admin      INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    created_at    TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);

-- ----------------------------------------------------------------
-- Folders
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS folders (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    name       TEXT NOT NULL,
    user_id    TEXT NOT NULL,                 -- owning user
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_folders_user_id ON folders(user_id);

-- ----------------------------------------------------------------
-- Notes
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notes (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    title      TEXT NOT NULL,
    content    TEXT NOT NULL,                 -- markdown source
    user_id    TEXT NOT NULL,                 -- owning user, immutable
    folder_id  TEXT,                          -- nullable (see above)
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_user_updated
    ON notes(user_id, updated_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
