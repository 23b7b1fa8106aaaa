//! Server-rendered views.
//!
//! Every function here is a pure function from structured data to an HTML
//! page; no view touches the store or the session.  User-supplied text is
//! HTML-escaped at the point of interpolation.  Note content is rendered
//! from markdown source on the note view page only; everywhere else it
//! stays plain text.

use axum::response::Html;
use pulldown_cmark::{html, Options, Parser};
use uuid::Uuid;

use carnet_store::{Folder, Note, User};

use crate::auth::Identity;
use crate::flash::Notice;

/// Escape text for interpolation into HTML.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render markdown source to an HTML fragment.
pub fn render_markdown(source: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(source, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

fn layout(title: &str, notice: Option<Notice>, nav: &str, body: &str) -> Html<String> {
    let notice_html = notice
        .map(|n| format!(r#"<p class="notice">{}</p>"#, escape(n.message())))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} - Carnet</title>
</head>
<body>
<nav>{nav}</nav>
{notice_html}
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}

fn nav_signed_out() -> String {
    r#"<a href="/login">Login</a> <a href="/register">Register</a>"#.to_string()
}

fn nav_signed_in(identity: &Identity) -> String {
    let admin_link = if identity.is_admin {
        r#" <a href="/admin">Admin</a>"#
    } else {
        ""
    };
    format!(
        r#"<a href="/dashboard">Dashboard</a> <a href="/note/new">New note</a>{admin_link}
<form action="/search" method="get"><input type="search" name="q" placeholder="Search notes"><button type="submit">Search</button></form>
<span>{}</span> <a href="/logout">Logout</a>"#,
        escape(&identity.username),
    )
}

// ---------------------------------------------------------------------------
// Auth pages
// ---------------------------------------------------------------------------

pub fn login_page(notice: Option<Notice>) -> Html<String> {
    layout(
        "Login",
        notice,
        &nav_signed_out(),
        r#"<h1>Login</h1>
<form action="/login" method="post">
<label>Username <input type="text" name="username" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Login</button>
</form>
<p>No account yet? <a href="/register">Register</a></p>"#,
    )
}

pub fn register_page(notice: Option<Notice>) -> Html<String> {
    layout(
        "Register",
        notice,
        &nav_signed_out(),
        r#"<h1>Register</h1>
<form action="/register" method="post">
<label>Username <input type="text" name="username" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Register</button>
</form>
<p>Already registered? <a href="/login">Login</a></p>"#,
    )
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Structured data backing the dashboard page.
pub struct DashboardView<'a> {
    pub identity: &'a Identity,
    pub folders: &'a [Folder],
    pub notes: &'a [Note],
    /// The folder currently filtered on, if any.
    pub active_folder: Option<Uuid>,
    /// Heading above the note list ("All Notes", a folder name, or a
    /// search-results banner).
    pub heading: String,
    pub notice: Option<Notice>,
}

pub fn dashboard_page(view: DashboardView<'_>) -> Html<String> {
    let mut folders_html = String::from(r#"<h2>Folders</h2><ul>"#);
    folders_html.push_str(r#"<li><a href="/dashboard">All Notes</a></li>"#);
    for folder in view.folders {
        let marker = if view.active_folder == Some(folder.id) {
            " (active)"
        } else {
            ""
        };
        folders_html.push_str(&format!(
            r#"<li><a href="/dashboard/{id}">{name}</a>{marker}
<form action="/folder/rename/{id}" method="post"><input type="text" name="new_name" placeholder="New name"><button type="submit">Rename</button></form></li>"#,
            id = folder.id,
            name = escape(&folder.name),
        ));
    }
    folders_html.push_str("</ul>");
    folders_html.push_str(
        r#"<form action="/folder/create" method="post"><input type="text" name="name" placeholder="Folder name"><button type="submit">Create folder</button></form>"#,
    );

    let mut notes_html = format!("<h2>{}</h2><ul>", escape(&view.heading));
    for note in view.notes {
        notes_html.push_str(&format!(
            r#"<li><a href="/note/view/{id}">{title}</a> <small>updated {updated}</small>
<a href="/note/edit/{id}">Edit</a> <a href="/note/delete/{id}">Delete</a></li>"#,
            id = note.id,
            title = escape(&note.title),
            updated = note.updated_at.format("%Y-%m-%d %H:%M"),
        ));
    }
    if view.notes.is_empty() {
        notes_html.push_str("<li>No notes yet.</li>");
    }
    notes_html.push_str("</ul>");

    let new_note_href = match view.active_folder {
        Some(folder_id) => format!("/note/new/{folder_id}"),
        None => "/note/new".to_string(),
    };
    let body = format!(
        r#"{folders_html}
{notes_html}
<p><a href="{new_note_href}">New note</a></p>"#
    );

    layout("Dashboard", view.notice, &nav_signed_in(view.identity), &body)
}

// ---------------------------------------------------------------------------
// Note pages
// ---------------------------------------------------------------------------

/// Note editor, used for both creation (`note` absent) and editing.
pub fn editor_page(
    identity: &Identity,
    folders: &[Folder],
    note: Option<&Note>,
    selected_folder: Option<Uuid>,
) -> Html<String> {
    let (action, title_value, content_value) = match note {
        Some(note) => (
            format!("/note/edit/{}", note.id),
            escape(&note.title),
            escape(&note.content),
        ),
        None => match selected_folder {
            Some(folder_id) => (format!("/note/new/{folder_id}"), String::new(), String::new()),
            None => ("/note/new".to_string(), String::new(), String::new()),
        },
    };

    // Preselect the note's own folder when editing, the dashboard's active
    // folder when creating.
    let current = note.and_then(|n| n.folder_id).or(selected_folder);

    let mut options = String::from(r#"<option value="">Uncategorized</option>"#);
    for folder in folders {
        let selected = if current == Some(folder.id) {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(
            r#"<option value="{id}"{selected}>{name}</option>"#,
            id = folder.id,
            name = escape(&folder.name),
        ));
    }

    let heading = if note.is_some() { "Edit note" } else { "New note" };
    let body = format!(
        r#"<h1>{heading}</h1>
<form action="{action}" method="post">
<label>Title <input type="text" name="title" value="{title_value}"></label>
<label>Folder <select name="folder_id">{options}</select></label>
<label>Content <textarea name="content" rows="20">{content_value}</textarea></label>
<button type="submit">Save</button>
</form>"#
    );

    layout(heading, None, &nav_signed_in(identity), &body)
}

/// Read-only note view with rendered markdown content.
pub fn note_page(identity: &Identity, note: &Note, folder_name: &str) -> Html<String> {
    let body = format!(
        r#"<h1>{title}</h1>
<p><small>Folder: {folder} | Created {created} | Updated {updated}</small></p>
<article>{content}</article>
<p><a href="/note/edit/{id}">Edit</a> <a href="/note/delete/{id}">Delete</a> <a href="/dashboard">Back</a></p>"#,
        title = escape(&note.title),
        folder = escape(folder_name),
        created = note.created_at.format("%Y-%m-%d %H:%M"),
        updated = note.updated_at.format("%Y-%m-%d %H:%M"),
        content = render_markdown(&note.content),
        id = note.id,
    );

    layout(&note.title, None, &nav_signed_in(identity), &body)
}

// ---------------------------------------------------------------------------
// Admin pages
// ---------------------------------------------------------------------------

pub fn admin_page(identity: &Identity, users: &[User], notice: Option<Notice>) -> Html<String> {
    let mut rows = String::new();
    for user in users {
        let role = if user.is_admin { "admin" } else { "user" };
        let actions = if user.id == identity.id {
            "<em>(you)</em>".to_string()
        } else {
            format!(
                r#"<a href="/admin/user/toggle_admin/{id}">Toggle admin</a> <a href="/admin/user/confirmation/{id}">Delete</a>"#,
                id = user.id,
            )
        };
        rows.push_str(&format!(
            "<tr><td>{username}</td><td>{role}</td><td>{actions}</td></tr>",
            username = escape(&user.username),
        ));
    }

    let body = format!(
        r#"<h1>User management</h1>
<table>
<tr><th>Username</th><th>Role</th><th></th></tr>
{rows}
</table>"#
    );

    layout("Admin", notice, &nav_signed_in(identity), &body)
}

/// Asks the admin to confirm deletion of `target` and everything they own.
pub fn confirmation_page(identity: &Identity, target: &User) -> Html<String> {
    let body = format!(
        r#"<h1>Delete user</h1>
<p>Delete <strong>{username}</strong> and all of their notes and folders? This cannot be undone.</p>
<form action="/admin/user/delete/{id}" method="post"><button type="submit">Delete</button></form>
<p><a href="/admin">Cancel</a></p>"#,
        username = escape(&target.username),
        id = target.id,
    );

    layout("Confirm deletion", None, &nav_signed_in(identity), &body)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Plain page for hard failures that have no safe view to redirect to.
pub fn error_page(message: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Error - Carnet</title></head>
<body><h1>Something went wrong</h1><p>{}</p></body>
</html>"#,
        escape(message),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn markdown_renders_basic_structure() {
        let html = render_markdown("# Heading\n\nsome *emphasis*");
        assert!(html.contains("<h1>Heading</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn dashboard_escapes_user_content() {
        let identity = Identity {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            is_admin: false,
        };
        let now = chrono::Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            title: "<b>sneaky</b>".to_string(),
            content: String::new(),
            user_id: identity.id,
            folder_id: None,
            created_at: now,
            updated_at: now,
        };

        let Html(page) = dashboard_page(DashboardView {
            identity: &identity,
            folders: &[],
            notes: &[note],
            active_folder: None,
            heading: "All Notes".to_string(),
            notice: None,
        });

        assert!(page.contains("&lt;b&gt;sneaky&lt;/b&gt;"));
        assert!(!page.contains("<b>sneaky</b>"));
    }
}
