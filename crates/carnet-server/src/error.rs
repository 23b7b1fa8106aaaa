//! Request-level error type.
//!
//! Every variant except the storage/internal pair resolves to a flash notice
//! plus a redirect to a safe prior view, mirroring how the application never
//! shows a raw fault page for a user-level failure.  Ownership violations
//! surface as `NotFound`, indistinguishable from a genuinely missing record.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

use carnet_store::StoreError;

use crate::flash::{self, Notice};
use crate::views;

/// Which kind of record an operation failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Note,
    User,
}

/// Which self-targeted admin action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfAction {
    Delete,
    Demote,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("admin privileges required")]
    Forbidden,

    #[error("admin operations may not target the acting account")]
    SelfActionForbidden(SelfAction),

    #[error("record not found")]
    NotFound(Resource),

    #[error("username already exists")]
    DuplicateUsername,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("name must not be empty")]
    InvalidInput,

    #[error("invalid folder reference")]
    InvalidFolderReference,

    #[error("invalid search pattern")]
    InvalidPattern,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    /// Catch-all conversion for store failures.
    ///
    /// Call sites that need to distinguish `StoreError::NotFound` (to map it
    /// to a domain-level `NotFound`) must do so before applying `?`.
    fn from(err: StoreError) -> Self {
        AppError::StorageUnavailable(err)
    }
}

impl AppError {
    /// The notice flashed on the page the user is redirected to.
    fn notice(&self) -> Option<Notice> {
        match self {
            AppError::Unauthenticated => Some(Notice::LoginRequired),
            AppError::Forbidden => Some(Notice::AccessDenied),
            AppError::SelfActionForbidden(SelfAction::Delete) => Some(Notice::CannotDeleteSelf),
            AppError::SelfActionForbidden(SelfAction::Demote) => Some(Notice::CannotDemoteSelf),
            AppError::NotFound(Resource::Note) => Some(Notice::NoteNotFound),
            AppError::NotFound(Resource::User) => Some(Notice::UserNotFound),
            AppError::DuplicateUsername => Some(Notice::UsernameTaken),
            AppError::InvalidCredentials => Some(Notice::InvalidCredentials),
            AppError::InvalidInput => Some(Notice::FolderNameRequired),
            AppError::InvalidFolderReference => Some(Notice::InvalidFolder),
            AppError::InvalidPattern => Some(Notice::InvalidSearchPattern),
            AppError::StorageUnavailable(_) | AppError::Internal(_) => None,
        }
    }

    /// The safe prior view the user is sent back to.
    fn redirect_target(&self) -> &'static str {
        match self {
            AppError::Unauthenticated | AppError::InvalidCredentials => "/login",
            AppError::DuplicateUsername => "/register",
            AppError::SelfActionForbidden(_) | AppError::NotFound(Resource::User) => "/admin",
            AppError::Forbidden
            | AppError::NotFound(Resource::Note)
            | AppError::InvalidInput
            | AppError::InvalidFolderReference
            | AppError::InvalidPattern => "/dashboard",
            AppError::StorageUnavailable(_) | AppError::Internal(_) => "/",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::StorageUnavailable(err) => {
                tracing::error!(error = %err, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    views::error_page("The storage backend is unavailable. Please try again later."),
                )
                    .into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    views::error_page("Internal server error"),
                )
                    .into_response()
            }
            _ => {
                tracing::debug!(error = %self, "request rejected");
                let redirect = Redirect::to(self.redirect_target());
                match self.notice() {
                    Some(notice) => (flash::set(notice), redirect).into_response(),
                    None => redirect.into_response(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::SET_COOKIE;

    #[test]
    fn user_level_errors_redirect_with_notice() {
        let response = AppError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("location").unwrap(), "/login");
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("carnet_notice=bad-credentials"));
    }

    #[test]
    fn ownership_violation_and_missing_record_look_identical() {
        let foreign = AppError::NotFound(Resource::Note).into_response();
        let missing = AppError::NotFound(Resource::Note).into_response();
        assert_eq!(foreign.status(), missing.status());
        assert_eq!(
            foreign.headers().get("location"),
            missing.headers().get("location")
        );
    }

    #[test]
    fn storage_failure_is_a_hard_500() {
        let response = AppError::StorageUnavailable(StoreError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("location").is_none());
    }
}
