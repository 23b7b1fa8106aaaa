//! HTTP surface of the application.
//!
//! Every route resolves the acting [`Identity`] first (except the public
//! register/login pair), then runs the requested operation scoped to that
//! identity.  Admin routes additionally gate on the admin flag inside the
//! handler.  Failures become flash notices plus redirects via
//! [`AppError`]'s `IntoResponse` impl.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use regex::RegexBuilder;
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use carnet_store::{Database, Folder, Note, StoreError, User};

use crate::auth::{self, Identity};
use crate::error::{AppError, Resource, SelfAction};
use crate::flash::{self, Notice};
use crate::sessions::{self, SessionStore};
use crate::views::{self, DashboardView};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub sessions: SessionStore,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/:folder_id", get(dashboard_folder))
        .route("/folder/create", post(create_folder))
        .route("/folder/rename/:folder_id", post(rename_folder))
        .route("/note/new", get(new_note_form).post(create_note))
        .route("/note/new/:folder_id", get(new_note_form_in_folder).post(create_note))
        .route("/note/view/:note_id", get(view_note))
        .route("/note/edit/:note_id", get(edit_note_form).post(update_note))
        .route("/note/delete/:note_id", get(delete_note))
        .route("/search", get(search))
        .route("/admin", get(admin_users))
        .route("/admin/user/confirmation/:user_id", get(confirm_delete_user))
        .route("/admin/user/delete/:user_id", post(delete_user))
        .route("/admin/user/toggle_admin/:user_id", get(toggle_admin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Forms and queries
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CredentialsForm {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct CreateFolderForm {
    name: String,
}

#[derive(Deserialize)]
struct RenameFolderForm {
    new_name: String,
}

#[derive(Deserialize)]
struct NoteForm {
    title: String,
    content: String,
    /// Folder select value; the empty string means "Uncategorized".
    #[serde(default)]
    folder_id: String,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

// ---------------------------------------------------------------------------
// Small helpers
// ---------------------------------------------------------------------------

/// Render a page, clearing the notice cookie when one was shown.
fn with_flash_cleared(notice: Option<Notice>, page: Html<String>) -> Response {
    match notice {
        Some(_) => (flash::clear(), page).into_response(),
        None => page.into_response(),
    }
}

fn parse_folder_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidFolderReference)
}

/// Folder select value from the editor form: empty means no folder.
fn parse_folder_choice(raw: &str) -> Result<Option<Uuid>, AppError> {
    if raw.is_empty() {
        return Ok(None);
    }
    parse_folder_id(raw).map(Some)
}

/// Where to land after saving a note: the folder it was filed into, or the
/// unfiltered dashboard.
fn dashboard_redirect(folder_id: Option<Uuid>) -> Redirect {
    match folder_id {
        Some(folder_id) => Redirect::to(&format!("/dashboard/{folder_id}")),
        None => Redirect::to("/dashboard"),
    }
}

// ---------------------------------------------------------------------------
// Public routes
// ---------------------------------------------------------------------------

async fn index(identity: Option<Identity>) -> Redirect {
    match identity {
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/login"),
    }
}

async fn register_form(identity: Option<Identity>, headers: HeaderMap) -> Response {
    if identity.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let notice = flash::peek(&headers);
    with_flash_cleared(notice, views::register_page(notice))
}

async fn register(
    State(state): State<AppState>,
    identity: Option<Identity>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    if identity.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let db = state.db.lock().await;

    // The existence check and the insert are two separate statements, so two
    // concurrent registrations of the same username can both pass the check.
    if db.username_exists(&form.username)? {
        return Err(AppError::DuplicateUsername);
    }

    let password_hash = auth::hash_password(&form.password)?;

    // First account ever registered becomes the admin.  Two concurrent first
    // registrations can both observe an empty table and both get the flag.
    let is_admin = db.count_users()? == 0;

    let user = User {
        id: Uuid::new_v4(),
        username: form.username,
        password_hash,
        is_admin,
        created_at: Utc::now(),
    };
    db.create_user(&user)?;

    info!(user = %user.id, username = %user.username, is_admin, "user registered");

    Ok((flash::set(Notice::RegistrationSuccessful), Redirect::to("/login")).into_response())
}

async fn login_form(identity: Option<Identity>, headers: HeaderMap) -> Response {
    if identity.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let notice = flash::peek(&headers);
    with_flash_cleared(notice, views::login_page(notice))
}

async fn login(
    State(state): State<AppState>,
    identity: Option<Identity>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    if identity.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let user = {
        let db = state.db.lock().await;
        match db.get_user_by_username(&form.username) {
            Ok(user) => user,
            // An unknown username and a wrong password are indistinguishable.
            Err(StoreError::NotFound) => return Err(AppError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        }
    };

    if !auth::verify_password(&form.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.sessions.create(user.id).await;
    info!(user = %user.id, "login");

    Ok((sessions::set_cookie(token), Redirect::to("/dashboard")).into_response())
}

async fn logout(
    _identity: Identity,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if let Some(token) = sessions::token_from_headers(&headers) {
        state.sessions.destroy(token).await;
    }
    (sessions::clear_cookie(), Redirect::to("/login")).into_response()
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

async fn dashboard(
    State(state): State<AppState>,
    identity: Identity,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    render_dashboard(&state, &identity, None, flash::peek(&headers)).await
}

async fn dashboard_folder(
    State(state): State<AppState>,
    identity: Identity,
    headers: HeaderMap,
    Path(folder_id): Path<String>,
) -> Result<Response, AppError> {
    let folder_id = parse_folder_id(&folder_id)?;
    render_dashboard(&state, &identity, Some(folder_id), flash::peek(&headers)).await
}

async fn render_dashboard(
    state: &AppState,
    identity: &Identity,
    folder: Option<Uuid>,
    notice: Option<Notice>,
) -> Result<Response, AppError> {
    let db = state.db.lock().await;
    let folders = db.list_folders(identity.id)?;
    let notes = db.list_notes(identity.id, folder)?;

    // The heading lookup resolves any existing folder id, without an
    // ownership check; filtering by someone else's folder shows its name but
    // never their notes, which stay scoped to the acting user above.
    let heading = match folder {
        Some(folder_id) => match db.get_folder(folder_id) {
            Ok(f) => f.name,
            Err(StoreError::NotFound) => "Notes".to_string(),
            Err(e) => return Err(e.into()),
        },
        None => "All Notes".to_string(),
    };

    Ok(with_flash_cleared(
        notice,
        views::dashboard_page(DashboardView {
            identity,
            folders: &folders,
            notes: &notes,
            active_folder: folder,
            heading,
            notice,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

async fn create_folder(
    State(state): State<AppState>,
    identity: Identity,
    Form(form): Form<CreateFolderForm>,
) -> Result<Response, AppError> {
    if form.name.is_empty() {
        return Err(AppError::InvalidInput);
    }

    let folder = Folder {
        id: Uuid::new_v4(),
        name: form.name,
        user_id: identity.id,
        created_at: Utc::now(),
    };
    state.db.lock().await.create_folder(&folder)?;

    info!(user = %identity.id, folder = %folder.id, "folder created");
    Ok(Redirect::to("/dashboard").into_response())
}

async fn rename_folder(
    State(state): State<AppState>,
    identity: Identity,
    Path(folder_id): Path<String>,
    Form(form): Form<RenameFolderForm>,
) -> Result<Response, AppError> {
    let folder_id = parse_folder_id(&folder_id)?;
    if form.new_name.is_empty() {
        return Err(AppError::InvalidInput);
    }

    // A foreign or missing folder matches zero rows; silently accepted.
    state
        .db
        .lock()
        .await
        .rename_folder(identity.id, folder_id, &form.new_name)?;

    Ok(dashboard_redirect(Some(folder_id)).into_response())
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

async fn new_note_form(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Response, AppError> {
    let db = state.db.lock().await;
    let folders = db.list_folders(identity.id)?;
    Ok(views::editor_page(&identity, &folders, None, None).into_response())
}

async fn new_note_form_in_folder(
    State(state): State<AppState>,
    identity: Identity,
    Path(folder_id): Path<String>,
) -> Result<Response, AppError> {
    let folder_id = parse_folder_id(&folder_id)?;
    let db = state.db.lock().await;
    let folders = db.list_folders(identity.id)?;
    Ok(views::editor_page(&identity, &folders, None, Some(folder_id)).into_response())
}

async fn create_note(
    State(state): State<AppState>,
    identity: Identity,
    Form(form): Form<NoteForm>,
) -> Result<Response, AppError> {
    // The chosen folder is stored as given; it is not verified against the
    // folder table or the folder's owner.
    let folder_id = parse_folder_choice(&form.folder_id)?;

    let now = Utc::now();
    let note = Note {
        id: Uuid::new_v4(),
        title: form.title,
        content: form.content,
        user_id: identity.id,
        folder_id,
        created_at: now,
        updated_at: now,
    };
    state.db.lock().await.create_note(&note)?;

    info!(user = %identity.id, note = %note.id, "note created");
    Ok(dashboard_redirect(folder_id).into_response())
}

async fn view_note(
    State(state): State<AppState>,
    identity: Identity,
    Path(note_id): Path<String>,
) -> Result<Response, AppError> {
    // A malformed id is treated like a nonexistent one.
    let note_id =
        Uuid::parse_str(&note_id).map_err(|_| AppError::NotFound(Resource::Note))?;

    let db = state.db.lock().await;
    let note = match db.get_note(identity.id, note_id) {
        Ok(note) => note,
        Err(StoreError::NotFound) => return Err(AppError::NotFound(Resource::Note)),
        Err(e) => return Err(e.into()),
    };

    // Unscoped name lookup; a folder reference that no longer resolves
    // renders as Uncategorized.
    let folder_name = match note.folder_id {
        Some(folder_id) => match db.get_folder(folder_id) {
            Ok(folder) => folder.name,
            Err(StoreError::NotFound) => "Uncategorized".to_string(),
            Err(e) => return Err(e.into()),
        },
        None => "Uncategorized".to_string(),
    };

    Ok(views::note_page(&identity, &note, &folder_name).into_response())
}

async fn edit_note_form(
    State(state): State<AppState>,
    identity: Identity,
    Path(note_id): Path<String>,
) -> Result<Response, AppError> {
    let note_id =
        Uuid::parse_str(&note_id).map_err(|_| AppError::NotFound(Resource::Note))?;

    let db = state.db.lock().await;
    let note = match db.get_note(identity.id, note_id) {
        Ok(note) => note,
        Err(StoreError::NotFound) => return Err(AppError::NotFound(Resource::Note)),
        Err(e) => return Err(e.into()),
    };
    let folders = db.list_folders(identity.id)?;

    Ok(views::editor_page(&identity, &folders, Some(&note), None).into_response())
}

async fn update_note(
    State(state): State<AppState>,
    identity: Identity,
    Path(note_id): Path<String>,
    Form(form): Form<NoteForm>,
) -> Result<Response, AppError> {
    let note_id =
        Uuid::parse_str(&note_id).map_err(|_| AppError::NotFound(Resource::Note))?;
    let folder_id = parse_folder_choice(&form.folder_id)?;

    // Title and content are stored as given (empty allowed); the folder is
    // set or cleared; updated_at is refreshed.
    match state
        .db
        .lock()
        .await
        .update_note(identity.id, note_id, &form.title, &form.content, folder_id)
    {
        Ok(()) => {}
        Err(StoreError::NotFound) => return Err(AppError::NotFound(Resource::Note)),
        Err(e) => return Err(e.into()),
    }

    info!(user = %identity.id, note = %note_id, "note updated");
    Ok(dashboard_redirect(folder_id).into_response())
}

async fn delete_note(
    State(state): State<AppState>,
    identity: Identity,
    Path(note_id): Path<String>,
) -> Result<Response, AppError> {
    // Absent, foreign and malformed ids all delete nothing, silently.
    if let Ok(note_id) = Uuid::parse_str(&note_id) {
        let deleted = state.db.lock().await.delete_note(identity.id, note_id)?;
        if deleted {
            info!(user = %identity.id, note = %note_id, "note deleted");
        }
    }

    Ok((flash::set(Notice::NoteDeleted), Redirect::to("/dashboard")).into_response())
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

async fn search(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    // An empty pattern falls back to the unfiltered listing.
    if query.q.is_empty() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    // The pattern is compiled as a regular expression, not matched as a
    // literal substring; a malformed pattern is rejected.
    let pattern = RegexBuilder::new(&query.q)
        .case_insensitive(true)
        .build()
        .map_err(|_| AppError::InvalidPattern)?;

    let db = state.db.lock().await;
    let folders = db.list_folders(identity.id)?;
    let notes = db.search_notes(identity.id, &pattern)?;

    Ok(views::dashboard_page(DashboardView {
        identity: &identity,
        folders: &folders,
        notes: &notes,
        active_folder: None,
        heading: format!("Search Results: {}", query.q),
        notice: None,
    })
    .into_response())
}

// ---------------------------------------------------------------------------
// Admin governance
// ---------------------------------------------------------------------------

async fn admin_users(
    State(state): State<AppState>,
    identity: Identity,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    identity.require_admin()?;

    let users = state.db.lock().await.list_users()?;
    let notice = flash::peek(&headers);
    Ok(with_flash_cleared(
        notice,
        views::admin_page(&identity, &users, notice),
    ))
}

async fn confirm_delete_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    identity.require_admin()?;

    let target_id =
        Uuid::parse_str(&user_id).map_err(|_| AppError::NotFound(Resource::User))?;
    if target_id == identity.id {
        return Err(AppError::SelfActionForbidden(SelfAction::Delete));
    }

    let db = state.db.lock().await;
    let target = match db.get_user(target_id) {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AppError::NotFound(Resource::User)),
        Err(e) => return Err(e.into()),
    };

    Ok(views::confirmation_page(&identity, &target).into_response())
}

async fn delete_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    identity.require_admin()?;

    let target_id =
        Uuid::parse_str(&user_id).map_err(|_| AppError::NotFound(Resource::User))?;
    if target_id == identity.id {
        return Err(AppError::SelfActionForbidden(SelfAction::Delete));
    }

    // Cascade: notes, then folders, then the user record.  The steps are
    // separate statements, not a transaction; a failure part-way leaves
    // orphaned rows rather than rolling back.
    let db = state.db.lock().await;
    let notes_removed = db.delete_notes_for_user(target_id)?;
    let folders_removed = db.delete_folders_for_user(target_id)?;
    let _ = db.delete_user(target_id)?;

    info!(
        admin = %identity.id,
        target = %target_id,
        notes_removed,
        folders_removed,
        "user deleted"
    );

    Ok((flash::set(Notice::UserDeleted), Redirect::to("/admin")).into_response())
}

async fn toggle_admin(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    identity.require_admin()?;

    // A malformed id behaves like a missing user: silent redirect.
    let Ok(target_id) = Uuid::parse_str(&user_id) else {
        return Ok(Redirect::to("/admin").into_response());
    };
    if target_id == identity.id {
        return Err(AppError::SelfActionForbidden(SelfAction::Demote));
    }

    let db = state.db.lock().await;
    match db.get_user(target_id) {
        Ok(target) => {
            let promoted = !target.is_admin;
            db.set_admin(target.id, promoted)?;

            info!(admin = %identity.id, target = %target.id, promoted, "admin flag toggled");
            let notice = if promoted {
                Notice::UserPromoted
            } else {
                Notice::UserDemoted
            };
            Ok((flash::set(notice), Redirect::to("/admin")).into_response())
        }
        // A missing target toggles nothing and flashes nothing.
        Err(StoreError::NotFound) => Ok(Redirect::to("/admin").into_response()),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Server entry
// ---------------------------------------------------------------------------

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> (tempfile::TempDir, AppState, Router) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let state = AppState {
            db: Arc::new(Mutex::new(db)),
            sessions: SessionStore::new(chrono::Duration::minutes(30)),
        };
        let app = build_router(state.clone());
        (dir, state, app)
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(LOCATION)
            .expect("redirect should carry a location")
            .to_str()
            .unwrap()
    }

    /// The notice code set by the response, if any.
    fn notice_code(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| {
                let rest = v.strip_prefix("carnet_notice=")?;
                let code = rest.split(';').next()?;
                (!code.is_empty()).then(|| code.to_string())
            })
    }

    async fn register(app: &Router, username: &str, password: &str) -> Response {
        app.clone()
            .oneshot(form_request(
                "/register",
                &format!("username={username}&password={password}"),
                None,
            ))
            .await
            .unwrap()
    }

    /// Log in and return the session cookie pair to send on later requests.
    async fn login(app: &Router, username: &str, password: &str) -> String {
        let response = app
            .clone()
            .oneshot(form_request(
                "/login",
                &format!("username={username}&password={password}"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(location(&response), "/dashboard", "login should succeed");

        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.split(';').next().filter(|c| c.starts_with("carnet_session=")))
            .expect("login should set a session cookie")
            .to_string()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn first_registrant_is_admin_later_ones_are_not() {
        let (_dir, state, app) = test_app();

        let response = register(&app, "alice", "secret").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        register(&app, "bob", "hunter2").await;

        let db = state.db.lock().await;
        assert!(db.get_user_by_username("alice").unwrap().is_admin);
        assert!(!db.get_user_by_username("bob").unwrap().is_admin);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let (_dir, _state, app) = test_app();
        register(&app, "alice", "secret").await;

        let response = register(&app, "alice", "other").await;
        assert_eq!(location(&response), "/register");
        assert_eq!(notice_code(&response).as_deref(), Some("username-taken"));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (_dir, _state, app) = test_app();
        register(&app, "alice", "secret").await;

        let response = app
            .clone()
            .oneshot(form_request(
                "/login",
                "username=alice&password=wrong",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(location(&response), "/login");
        assert_eq!(notice_code(&response).as_deref(), Some("bad-credentials"));
    }

    #[tokio::test]
    async fn protected_routes_redirect_anonymous_users_to_login() {
        let (_dir, _state, app) = test_app();

        for uri in ["/dashboard", "/note/new", "/search?q=x", "/admin"] {
            let response = app.clone().oneshot(get_request(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), "/login", "{uri}");
        }
    }

    #[tokio::test]
    async fn logout_destroys_the_session() {
        let (_dir, _state, app) = test_app();
        register(&app, "alice", "secret").await;
        let cookie = login(&app, "alice", "secret").await;

        let response = app
            .clone()
            .oneshot(get_request("/dashboard", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_request("/logout", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(location(&response), "/login");

        let response = app
            .clone()
            .oneshot(get_request("/dashboard", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn notes_and_folders_are_isolated_between_users() {
        let (_dir, state, app) = test_app();
        register(&app, "alice", "secret").await;
        register(&app, "bob", "hunter2").await;
        let alice = login(&app, "alice", "secret").await;
        let bob = login(&app, "bob", "hunter2").await;

        app.clone()
            .oneshot(form_request("/folder/create", "name=Work", Some(&alice)))
            .await
            .unwrap();
        app.clone()
            .oneshot(form_request(
                "/note/new",
                "title=T1&content=alicebody",
                Some(&alice),
            ))
            .await
            .unwrap();

        let note_id = {
            let db = state.db.lock().await;
            let owner = db.get_user_by_username("alice").unwrap().id;
            db.list_notes(owner, None).unwrap()[0].id
        };

        // Bob sees neither the note page nor any listing entry.
        let response = app
            .clone()
            .oneshot(get_request(&format!("/note/view/{note_id}"), Some(&bob)))
            .await
            .unwrap();
        assert_eq!(location(&response), "/dashboard");
        assert_eq!(notice_code(&response).as_deref(), Some("note-not-found"));

        let dashboard = body_text(
            app.clone()
                .oneshot(get_request("/dashboard", Some(&bob)))
                .await
                .unwrap(),
        )
        .await;
        assert!(!dashboard.contains("T1"));
        assert!(!dashboard.contains("Work"));

        // The owner still sees both.
        let dashboard = body_text(
            app.clone()
                .oneshot(get_request("/dashboard", Some(&alice)))
                .await
                .unwrap(),
        )
        .await;
        assert!(dashboard.contains("T1"));
        assert!(dashboard.contains("Work"));
    }

    #[tokio::test]
    async fn folder_filter_restricts_the_listing() {
        let (_dir, state, app) = test_app();
        register(&app, "alice", "secret").await;
        let cookie = login(&app, "alice", "secret").await;

        app.clone()
            .oneshot(form_request("/folder/create", "name=Work", Some(&cookie)))
            .await
            .unwrap();
        let folder_id = {
            let db = state.db.lock().await;
            let owner = db.get_user_by_username("alice").unwrap().id;
            db.list_folders(owner).unwrap()[0].id
        };

        app.clone()
            .oneshot(form_request(
                "/note/new",
                &format!("title=Filed&content=x&folder_id={folder_id}"),
                Some(&cookie),
            ))
            .await
            .unwrap();
        app.clone()
            .oneshot(form_request(
                "/note/new",
                "title=Loose&content=y",
                Some(&cookie),
            ))
            .await
            .unwrap();

        let page = body_text(
            app.clone()
                .oneshot(get_request(&format!("/dashboard/{folder_id}"), Some(&cookie)))
                .await
                .unwrap(),
        )
        .await;
        assert!(page.contains("Filed"));
        assert!(!page.contains("Loose"));

        // A malformed folder id falls back to the unfiltered listing.
        let response = app
            .clone()
            .oneshot(get_request("/dashboard/not-a-uuid", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(location(&response), "/dashboard");
        assert_eq!(notice_code(&response).as_deref(), Some("invalid-folder"));
    }

    #[tokio::test]
    async fn editing_a_note_refreshes_its_timestamp() {
        let (_dir, state, app) = test_app();
        register(&app, "alice", "secret").await;
        let cookie = login(&app, "alice", "secret").await;

        app.clone()
            .oneshot(form_request("/note/new", "title=T&content=v1", Some(&cookie)))
            .await
            .unwrap();

        let (owner, note) = {
            let db = state.db.lock().await;
            let owner = db.get_user_by_username("alice").unwrap().id;
            let note = db.list_notes(owner, None).unwrap().remove(0);
            (owner, note)
        };
        assert_eq!(note.created_at, note.updated_at);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        app.clone()
            .oneshot(form_request(
                &format!("/note/edit/{}", note.id),
                "title=T&content=v2",
                Some(&cookie),
            ))
            .await
            .unwrap();

        let db = state.db.lock().await;
        let edited = db.get_note(owner, note.id).unwrap();
        assert_eq!(edited.content, "v2");
        assert_eq!(edited.created_at, note.created_at);
        assert!(edited.updated_at > note.updated_at);
    }

    #[tokio::test]
    async fn search_is_regex_based_and_validated() {
        let (_dir, _state, app) = test_app();
        register(&app, "alice", "secret").await;
        let cookie = login(&app, "alice", "secret").await;

        app.clone()
            .oneshot(form_request(
                "/note/new",
                "title=Groceries&content=buy+milk",
                Some(&cookie),
            ))
            .await
            .unwrap();
        app.clone()
            .oneshot(form_request(
                "/note/new",
                "title=Other&content=nothing",
                Some(&cookie),
            ))
            .await
            .unwrap();

        let page = body_text(
            app.clone()
                .oneshot(get_request("/search?q=MILK", Some(&cookie)))
                .await
                .unwrap(),
        )
        .await;
        assert!(page.contains("Groceries"));
        assert!(!page.contains("Other"));

        // Empty pattern falls back to the unfiltered listing.
        let response = app
            .clone()
            .oneshot(get_request("/search?q=", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(location(&response), "/dashboard");

        // Malformed regex is rejected with a notice.
        let response = app
            .clone()
            .oneshot(get_request("/search?q=(", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(location(&response), "/dashboard");
        assert_eq!(notice_code(&response).as_deref(), Some("invalid-pattern"));
    }

    #[tokio::test]
    async fn admin_routes_reject_non_admins() {
        let (_dir, _state, app) = test_app();
        register(&app, "alice", "secret").await;
        register(&app, "bob", "hunter2").await;
        let bob = login(&app, "bob", "hunter2").await;

        let response = app
            .clone()
            .oneshot(get_request("/admin", Some(&bob)))
            .await
            .unwrap();
        assert_eq!(location(&response), "/dashboard");
        assert_eq!(notice_code(&response).as_deref(), Some("access-denied"));
    }

    #[tokio::test]
    async fn admins_cannot_target_themselves() {
        let (_dir, state, app) = test_app();
        register(&app, "alice", "secret").await;
        let cookie = login(&app, "alice", "secret").await;
        let alice_id = {
            let db = state.db.lock().await;
            db.get_user_by_username("alice").unwrap().id
        };

        let response = app
            .clone()
            .oneshot(get_request(
                &format!("/admin/user/toggle_admin/{alice_id}"),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(location(&response), "/admin");
        assert_eq!(notice_code(&response).as_deref(), Some("self-demote"));

        let response = app
            .clone()
            .oneshot(form_request(
                &format!("/admin/user/delete/{alice_id}"),
                "",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(location(&response), "/admin");
        assert_eq!(notice_code(&response).as_deref(), Some("self-delete"));

        // The sole admin is still an admin and still exists.
        let db = state.db.lock().await;
        let alice = db.get_user(alice_id).unwrap();
        assert!(alice.is_admin);
    }

    #[tokio::test]
    async fn toggle_admin_promotes_and_demotes_others() {
        let (_dir, state, app) = test_app();
        register(&app, "alice", "secret").await;
        register(&app, "bob", "hunter2").await;
        let cookie = login(&app, "alice", "secret").await;
        let bob_id = {
            let db = state.db.lock().await;
            db.get_user_by_username("bob").unwrap().id
        };

        let response = app
            .clone()
            .oneshot(get_request(
                &format!("/admin/user/toggle_admin/{bob_id}"),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(notice_code(&response).as_deref(), Some("user-promoted"));
        assert!(state.db.lock().await.get_user(bob_id).unwrap().is_admin);

        let response = app
            .clone()
            .oneshot(get_request(
                &format!("/admin/user/toggle_admin/{bob_id}"),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(notice_code(&response).as_deref(), Some("user-demoted"));
        assert!(!state.db.lock().await.get_user(bob_id).unwrap().is_admin);

        // A missing target toggles nothing and flashes nothing.
        let response = app
            .clone()
            .oneshot(get_request(
                &format!("/admin/user/toggle_admin/{}", Uuid::new_v4()),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(location(&response), "/admin");
        assert_eq!(notice_code(&response), None);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_their_data() {
        let (_dir, state, app) = test_app();
        register(&app, "alice", "secret").await;
        register(&app, "bob", "hunter2").await;
        let alice = login(&app, "alice", "secret").await;
        let bob = login(&app, "bob", "hunter2").await;

        // Bob accumulates a folder and a note; Alice keeps one of her own.
        app.clone()
            .oneshot(form_request("/folder/create", "name=BobStuff", Some(&bob)))
            .await
            .unwrap();
        app.clone()
            .oneshot(form_request("/note/new", "title=BobNote&content=b", Some(&bob)))
            .await
            .unwrap();
        app.clone()
            .oneshot(form_request(
                "/note/new",
                "title=AliceNote&content=a",
                Some(&alice),
            ))
            .await
            .unwrap();

        let bob_id = {
            let db = state.db.lock().await;
            db.get_user_by_username("bob").unwrap().id
        };

        // The confirmation page names the target.
        let page = body_text(
            app.clone()
                .oneshot(get_request(
                    &format!("/admin/user/confirmation/{bob_id}"),
                    Some(&alice),
                ))
                .await
                .unwrap(),
        )
        .await;
        assert!(page.contains("bob"));

        let response = app
            .clone()
            .oneshot(form_request(
                &format!("/admin/user/delete/{bob_id}"),
                "",
                Some(&alice),
            ))
            .await
            .unwrap();
        assert_eq!(location(&response), "/admin");
        assert_eq!(notice_code(&response).as_deref(), Some("user-deleted"));

        {
            let db = state.db.lock().await;
            assert!(matches!(db.get_user(bob_id), Err(StoreError::NotFound)));
            assert!(db.list_notes(bob_id, None).unwrap().is_empty());
            assert!(db.list_folders(bob_id).unwrap().is_empty());

            // Alice's data is untouched.
            let alice_id = db.get_user_by_username("alice").unwrap().id;
            assert_eq!(db.list_notes(alice_id, None).unwrap().len(), 1);
        }

        // Bob's live session no longer resolves to an account.
        let response = app
            .clone()
            .oneshot(get_request("/dashboard", Some(&bob)))
            .await
            .unwrap();
        assert_eq!(location(&response), "/login");

        // Deleting a user that is already gone still lands on the admin page.
        let response = app
            .clone()
            .oneshot(form_request(
                &format!("/admin/user/delete/{bob_id}"),
                "",
                Some(&alice),
            ))
            .await
            .unwrap();
        assert_eq!(location(&response), "/admin");
    }
}
