//! One-shot notice messages carried across a redirect.
//!
//! Every failure and every state-changing success surfaces a short
//! human-readable notice on the next rendered page.  The notice travels in a
//! short-lived cookie holding a stable code rather than free text, so the
//! value never needs escaping or encoding.  Page handlers read the cookie
//! with [`peek`] and clear it with [`clear`] when rendering.

use axum::http::header::{HeaderMap, HeaderName, COOKIE, SET_COOKIE};
use axum::response::AppendHeaders;

/// Cookie that carries the pending notice code.
pub const NOTICE_COOKIE: &str = "carnet_notice";

/// A user-visible notice, identified by a stable cookie code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    RegistrationSuccessful,
    LoginRequired,
    InvalidCredentials,
    UsernameTaken,
    FolderNameRequired,
    InvalidFolder,
    InvalidSearchPattern,
    NoteDeleted,
    NoteNotFound,
    AccessDenied,
    UserNotFound,
    CannotDeleteSelf,
    CannotDemoteSelf,
    UserDeleted,
    UserPromoted,
    UserDemoted,
}

impl Notice {
    /// Stable code stored in the cookie.
    pub fn code(self) -> &'static str {
        match self {
            Notice::RegistrationSuccessful => "registered",
            Notice::LoginRequired => "login-required",
            Notice::InvalidCredentials => "bad-credentials",
            Notice::UsernameTaken => "username-taken",
            Notice::FolderNameRequired => "folder-name-required",
            Notice::InvalidFolder => "invalid-folder",
            Notice::InvalidSearchPattern => "invalid-pattern",
            Notice::NoteDeleted => "note-deleted",
            Notice::NoteNotFound => "note-not-found",
            Notice::AccessDenied => "access-denied",
            Notice::UserNotFound => "user-not-found",
            Notice::CannotDeleteSelf => "self-delete",
            Notice::CannotDemoteSelf => "self-demote",
            Notice::UserDeleted => "user-deleted",
            Notice::UserPromoted => "user-promoted",
            Notice::UserDemoted => "user-demoted",
        }
    }

    /// Parse a cookie code back into a notice.  Unknown codes are dropped.
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "registered" => Notice::RegistrationSuccessful,
            "login-required" => Notice::LoginRequired,
            "bad-credentials" => Notice::InvalidCredentials,
            "username-taken" => Notice::UsernameTaken,
            "folder-name-required" => Notice::FolderNameRequired,
            "invalid-folder" => Notice::InvalidFolder,
            "invalid-pattern" => Notice::InvalidSearchPattern,
            "note-deleted" => Notice::NoteDeleted,
            "note-not-found" => Notice::NoteNotFound,
            "access-denied" => Notice::AccessDenied,
            "user-not-found" => Notice::UserNotFound,
            "self-delete" => Notice::CannotDeleteSelf,
            "self-demote" => Notice::CannotDemoteSelf,
            "user-deleted" => Notice::UserDeleted,
            "user-promoted" => Notice::UserPromoted,
            "user-demoted" => Notice::UserDemoted,
            _ => return None,
        })
    }

    /// Message shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            Notice::RegistrationSuccessful => "Registration successful. Please login.",
            Notice::LoginRequired => "Please log in to access this page.",
            Notice::InvalidCredentials => "Invalid username or password",
            Notice::UsernameTaken => "Username already exists",
            Notice::FolderNameRequired => "Folder name must not be empty",
            Notice::InvalidFolder => "Invalid folder",
            Notice::InvalidSearchPattern => "Invalid search pattern",
            Notice::NoteDeleted => "Note deleted",
            Notice::NoteNotFound => "Note not found",
            Notice::AccessDenied => "Access denied",
            Notice::UserNotFound => "User not found",
            Notice::CannotDeleteSelf => "You cannot delete your own account",
            Notice::CannotDemoteSelf => "You cannot remove your own admin status",
            Notice::UserDeleted => "User and all associated data deleted",
            Notice::UserPromoted => "User promoted to admin",
            Notice::UserDemoted => "User demoted to user",
        }
    }
}

/// Response parts that set a pending notice for the next page view.
pub fn set(notice: Notice) -> AppendHeaders<[(HeaderName, String); 1]> {
    AppendHeaders([(
        SET_COOKIE,
        format!(
            "{NOTICE_COOKIE}={}; Path=/; Max-Age=60; HttpOnly",
            notice.code()
        ),
    )])
}

/// Response parts that clear the notice cookie after it has been shown.
pub fn clear() -> AppendHeaders<[(HeaderName, String); 1]> {
    AppendHeaders([(
        SET_COOKIE,
        format!("{NOTICE_COOKIE}=; Path=/; Max-Age=0; HttpOnly"),
    )])
}

/// Read the pending notice from the request headers, if any.
pub fn peek(headers: &HeaderMap) -> Option<Notice> {
    cookie_value(headers, NOTICE_COOKIE).and_then(Notice::from_code)
}

/// Extract a single cookie value from the `Cookie` header.
pub(crate) fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn codes_round_trip() {
        let all = [
            Notice::RegistrationSuccessful,
            Notice::LoginRequired,
            Notice::InvalidCredentials,
            Notice::UsernameTaken,
            Notice::FolderNameRequired,
            Notice::InvalidFolder,
            Notice::InvalidSearchPattern,
            Notice::NoteDeleted,
            Notice::NoteNotFound,
            Notice::AccessDenied,
            Notice::UserNotFound,
            Notice::CannotDeleteSelf,
            Notice::CannotDemoteSelf,
            Notice::UserDeleted,
            Notice::UserPromoted,
            Notice::UserDemoted,
        ];
        for notice in all {
            assert_eq!(Notice::from_code(notice.code()), Some(notice));
        }
        assert_eq!(Notice::from_code("garbage"), None);
    }

    #[test]
    fn peek_finds_notice_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("carnet_session=abc; carnet_notice=note-deleted"),
        );
        assert_eq!(peek(&headers), Some(Notice::NoteDeleted));

        headers.insert(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(peek(&headers), None);
    }
}
