//! Credentials and identity resolution.
//!
//! Passwords are hashed with Argon2id (random salt, default parameters) and
//! stored as PHC-format strings.  Authenticated requests resolve their
//! session cookie to an [`Identity`] -- the value type `{id, username,
//! is_admin}` that every protected handler receives by value.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use carnet_store::{StoreError, User};

use crate::api::AppState;
use crate::error::AppError;
use crate::sessions;

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

/// Hash a password with Argon2id.  Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC-format hash.
///
/// A malformed stored hash verifies as `false`; the account is then simply
/// unusable until the password is reset, which is indistinguishable from a
/// wrong password to the caller.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::debug!("stored password hash is malformed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The resolved principal of a session.
///
/// Constructed once per request from the session cookie and passed by value
/// into every operation; handlers never look at the session again.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

impl Identity {
    /// Build an identity from a stored user record.
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }

    /// Gate an admin-only operation.  Non-admins are turned away with a
    /// denial notice, not a hard fault.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    /// Resolve the acting identity: session cookie -> token -> user record.
    ///
    /// A missing cookie, an unknown or expired token, and a session pointing
    /// at a deleted user all reject with `Unauthenticated`, which redirects
    /// to the login flow.
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            sessions::token_from_headers(&parts.headers).ok_or(AppError::Unauthenticated)?;
        let user_id = state
            .sessions
            .resolve(token)
            .await
            .ok_or(AppError::Unauthenticated)?;

        let db = state.db.lock().await;
        match db.get_user(user_id) {
            Ok(user) => Ok(Identity::from_user(&user)),
            // The account was deleted while the session was still live.
            Err(StoreError::NotFound) => Err(AppError::Unauthenticated),
            Err(e) => Err(AppError::StorageUnavailable(e)),
        }
    }
}
