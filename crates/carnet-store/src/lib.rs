//! # carnet-store
//!
//! Persistent storage for the Carnet note-taking application, backed by
//! SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model.  Folder and note queries are ownership-scoped: each takes the
//! acting user's id and filters on it in SQL, so a row belonging to another
//! user is indistinguishable from a row that does not exist.

pub mod database;
pub mod folders;
pub mod migrations;
pub mod models;
pub mod notes;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
