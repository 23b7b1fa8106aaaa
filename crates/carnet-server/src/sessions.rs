//! In-memory session tracking.
//!
//! A successful login mints an opaque token that travels in the
//! `carnet_session` cookie; the token maps to the logged-in user id in a
//! process-local table.  Records expire after a period of inactivity and a
//! background task evicts them periodically, so an abandoned browser does not
//! pin a session forever.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::header::{HeaderMap, HeaderName, SET_COOKIE};
use axum::response::AppendHeaders;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::flash::cookie_value;

/// Cookie that carries the session token.
pub const SESSION_COOKIE: &str = "carnet_session";

/// A live session record.
#[derive(Debug, Clone)]
struct SessionRecord {
    /// The authenticated user.
    user_id: Uuid,
    /// Last time the session was used.  Refreshed on every resolution.
    last_seen: DateTime<Utc>,
}

impl SessionRecord {
    /// Returns `true` if the session has been used within the TTL window.
    fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.last_seen < ttl
    }
}

/// Token -> user map shared across request handlers.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionRecord>>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store whose sessions expire after `ttl` of inactivity.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Mint a new session token for a user.
    pub async fn create(&self, user_id: Uuid) -> Uuid {
        let token = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            token,
            SessionRecord {
                user_id,
                last_seen: Utc::now(),
            },
        );
        token
    }

    /// Resolve a token to its user id, refreshing the inactivity window.
    ///
    /// Returns `None` for unknown or expired tokens; expired records are
    /// dropped on the spot rather than waiting for the purge task.
    pub async fn resolve(&self, token: Uuid) -> Option<Uuid> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&token) {
            Some(record) if record.is_fresh(self.ttl) => {
                record.last_seen = Utc::now();
                Some(record.user_id)
            }
            Some(_) => {
                sessions.remove(&token);
                None
            }
            None => None,
        }
    }

    /// Destroy a session (logout).
    pub async fn destroy(&self, token: Uuid) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&token);
    }

    /// Evict every expired session.
    pub async fn purge_expired(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, record| record.is_fresh(ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "purged expired sessions");
        }
    }
}

/// Read the session token from the request headers, if present and well
/// formed.
pub fn token_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    cookie_value(headers, SESSION_COOKIE).and_then(|v| Uuid::parse_str(v).ok())
}

/// Response parts that install the session cookie after login.
pub fn set_cookie(token: Uuid) -> AppendHeaders<[(HeaderName, String); 1]> {
    AppendHeaders([(
        SET_COOKIE,
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax"),
    )])
}

/// Response parts that remove the session cookie on logout.
pub fn clear_cookie() -> AppendHeaders<[(HeaderName, String); 1]> {
    AppendHeaders([(
        SET_COOKIE,
        format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"),
    )])
}
