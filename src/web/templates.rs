//! Server-rendered HTML for every screen.
//!
//! Pages are assembled from `format!` fragments around a shared shell.
//! All user-supplied data goes through [`html_escape`] before it is
//! interpolated.

use crate::db::sessions::{Flash, FlashLevel};
use crate::types::{Label, Status, Task, TaskFilter, User};

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Format a millisecond timestamp for display.
pub fn format_ts(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; margin: 0; background: #f5f6f8; color: #1f2430; }
    nav { background: #2b3245; color: #fff; padding: 0.6rem 1.2rem; display: flex; gap: 1rem; align-items: center; }
    nav a { color: #cdd5e8; text-decoration: none; }
    nav a:hover { color: #fff; }
    nav .spacer { flex: 1; }
    main { max-width: 60rem; margin: 1.5rem auto; padding: 0 1rem; }
    table { width: 100%; border-collapse: collapse; background: #fff; }
    th, td { text-align: left; padding: 0.5rem 0.7rem; border-bottom: 1px solid #e3e6ec; }
    th { background: #eceef3; }
    .flash { padding: 0.6rem 0.9rem; border-radius: 4px; margin-bottom: 0.8rem; }
    .flash-success { background: #e2f4e5; color: #1d6330; }
    .flash-error { background: #fbe3e4; color: #8f2430; }
    form.panel { background: #fff; padding: 1rem; border-radius: 4px; max-width: 28rem; }
    form.filter { background: #fff; padding: 0.8rem; border-radius: 4px; margin-bottom: 1rem;
                  display: flex; gap: 0.8rem; flex-wrap: wrap; align-items: end; }
    label { display: block; margin-bottom: 0.2rem; font-size: 0.9rem; }
    input[type=text], input[type=password], input[type=email], select, textarea {
        width: 100%; box-sizing: border-box; padding: 0.4rem; margin-bottom: 0.7rem;
        border: 1px solid #c6ccd8; border-radius: 3px; }
    form.filter input, form.filter select { width: auto; margin-bottom: 0; }
    button { background: #3659a8; color: #fff; border: 0; padding: 0.45rem 0.9rem;
             border-radius: 3px; cursor: pointer; }
    button.danger { background: #a83636; }
    .actions { display: flex; gap: 0.5rem; }
    .actions form { margin: 0; }
    .badge { background: #e3e8f4; border-radius: 3px; padding: 0.1rem 0.4rem; font-size: 0.85rem; }
"#;

/// Shared page shell with navigation and flash messages.
pub fn page(title: &str, user: Option<&User>, flashes: &[Flash], body: &str) -> String {
    let nav_right = match user {
        Some(user) => format!(
            r#"<a href="/statuses">Statuses</a>
               <a href="/labels">Labels</a>
               <span class="spacer"></span>
               <span>{}</span>
               <form method="post" action="/logout" style="margin:0"><button>Log out</button></form>"#,
            html_escape(&user.full_name())
        ),
        None => String::from(
            r#"<span class="spacer"></span>
               <a href="/login">Log in</a>
               <a href="/users/create">Sign up</a>"#,
        ),
    };

    let flash_html: String = flashes
        .iter()
        .map(|flash| {
            let class = match flash.level {
                FlashLevel::Success => "flash flash-success",
                FlashLevel::Error => "flash flash-error",
            };
            format!(
                r#"<div class="{}">{}</div>"#,
                class,
                html_escape(&flash.message)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{} - Taskboard</title>
<style>{}</style>
</head>
<body>
<nav>
  <a href="/"><strong>Taskboard</strong></a>
  <a href="/tasks">Tasks</a>
  <a href="/users">Users</a>
  {}
</nav>
<main>
{}
{}
</main>
</body>
</html>"#,
        html_escape(title),
        STYLE,
        nav_right,
        flash_html,
        body
    )
}

pub fn index_body() -> String {
    r#"<h1>Taskboard</h1>
<p>Track work items across your team: create tasks, assign executors,
move them through statuses, and tag them with labels.</p>
<p><a href="/tasks">Browse tasks</a></p>"#
        .to_string()
}

pub fn login_body(next: Option<&str>, error: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!(r#"<div class="flash flash-error">{}</div>"#, html_escape(e)))
        .unwrap_or_default();
    let next_field = next
        .map(|n| {
            format!(
                r#"<input type="hidden" name="next" value="{}">"#,
                html_escape(n)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<h1>Log in</h1>
{}
<form class="panel" method="post" action="/login">
  {}
  <label for="username">Username</label>
  <input type="text" id="username" name="username" required>
  <label for="password">Password</label>
  <input type="password" id="password" name="password" required>
  <button>Log in</button>
</form>"#,
        error_html, next_field
    )
}

/// Shared registration/profile form.
#[allow(clippy::too_many_arguments)]
pub fn user_form_body(
    heading: &str,
    action: &str,
    submit: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
    error: Option<&str>,
) -> String {
    let error_html = error
        .map(|e| format!(r#"<div class="flash flash-error">{}</div>"#, html_escape(e)))
        .unwrap_or_default();

    format!(
        r#"<h1>{}</h1>
{}
<form class="panel" method="post" action="{}">
  <label for="username">Username</label>
  <input type="text" id="username" name="username" value="{}" required>
  <label for="first_name">First name</label>
  <input type="text" id="first_name" name="first_name" value="{}">
  <label for="last_name">Last name</label>
  <input type="text" id="last_name" name="last_name" value="{}">
  <label for="email">Email</label>
  <input type="email" id="email" name="email" value="{}">
  <label for="password">Password</label>
  <input type="password" id="password" name="password">
  <label for="password_confirm">Confirm password</label>
  <input type="password" id="password_confirm" name="password_confirm">
  <button>{}</button>
</form>"#,
        html_escape(heading),
        error_html,
        html_escape(action),
        html_escape(username),
        html_escape(first_name),
        html_escape(last_name),
        html_escape(email),
        html_escape(submit)
    )
}

pub fn users_body(users: &[User], current_user: Option<i64>) -> String {
    let mut rows = String::new();
    for user in users {
        let actions = if current_user == Some(user.id) {
            format!(
                r#"<div class="actions">
                   <a href="/users/{0}/update">Edit</a>
                   <a href="/users/{0}/delete">Delete</a>
                   </div>"#,
                user.id
            )
        } else {
            String::new()
        };

        rows.push_str(&format!(
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            user.id,
            html_escape(&user.username),
            html_escape(&user.full_name()),
            format_ts(user.created_at),
            actions
        ));
    }

    format!(
        r#"<h1>Users</h1>
<table>
<thead><tr><th>ID</th><th>Username</th><th>Full name</th><th>Created</th><th></th></tr></thead>
<tbody>{}</tbody>
</table>"#,
        rows
    )
}

/// Shared status/label list screen.
pub fn named_list_body(
    heading: &str,
    base_path: &str,
    items: &[(i64, String, i64)],
) -> String {
    let mut rows = String::new();
    for (id, name, created_at) in items {
        rows.push_str(&format!(
            r#"<tr><td>{0}</td><td>{1}</td><td>{2}</td>
               <td><div class="actions">
               <a href="{3}/{0}/update">Edit</a>
               <a href="{3}/{0}/delete">Delete</a>
               </div></td></tr>"#,
            id,
            html_escape(name),
            format_ts(*created_at),
            base_path
        ));
    }

    format!(
        r#"<h1>{0}</h1>
<p><a href="{1}/create">Create new</a></p>
<table>
<thead><tr><th>ID</th><th>Name</th><th>Created</th><th></th></tr></thead>
<tbody>{2}</tbody>
</table>"#,
        html_escape(heading),
        base_path,
        rows
    )
}

pub fn statuses_body(statuses: &[Status]) -> String {
    let items: Vec<(i64, String, i64)> = statuses
        .iter()
        .map(|s| (s.id, s.name.clone(), s.created_at))
        .collect();
    named_list_body("Statuses", "/statuses", &items)
}

pub fn labels_body(labels: &[Label]) -> String {
    let items: Vec<(i64, String, i64)> = labels
        .iter()
        .map(|l| (l.id, l.name.clone(), l.created_at))
        .collect();
    named_list_body("Labels", "/labels", &items)
}

/// Shared single-name form for statuses and labels.
pub fn named_form_body(heading: &str, action: &str, name: &str, error: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!(r#"<div class="flash flash-error">{}</div>"#, html_escape(e)))
        .unwrap_or_default();

    format!(
        r#"<h1>{}</h1>
{}
<form class="panel" method="post" action="{}">
  <label for="name">Name</label>
  <input type="text" id="name" name="name" value="{}" required>
  <button>Save</button>
</form>"#,
        html_escape(heading),
        error_html,
        html_escape(action),
        html_escape(name)
    )
}

/// Delete confirmation screen shared by every entity.
pub fn delete_confirm_body(heading: &str, action: &str, subject: &str) -> String {
    format!(
        r#"<h1>{}</h1>
<p>Are you sure you want to delete <strong>{}</strong>?</p>
<form class="panel" method="post" action="{}">
  <button class="danger">Yes, delete</button> <a href="javascript:history.back()">Cancel</a>
</form>"#,
        html_escape(heading),
        html_escape(subject),
        html_escape(action)
    )
}

fn select_options(options: &[(i64, String)], selected: Option<i64>) -> String {
    let mut html = String::from(r#"<option value=""></option>"#);
    for (id, name) in options {
        let sel = if selected == Some(*id) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            id,
            sel,
            html_escape(name)
        ));
    }
    html
}

/// Task list screen with the filter form.
pub fn tasks_body(
    tasks: &[Task],
    statuses: &[Status],
    users: &[User],
    labels: &[Label],
    filter: &TaskFilter,
    authenticated: bool,
) -> String {
    let status_options: Vec<(i64, String)> =
        statuses.iter().map(|s| (s.id, s.name.clone())).collect();
    let executor_options: Vec<(i64, String)> =
        users.iter().map(|u| (u.id, u.full_name())).collect();
    let label_options: Vec<(i64, String)> =
        labels.iter().map(|l| (l.id, l.name.clone())).collect();

    let own_checked = if filter.own_tasks { " checked" } else { "" };
    let own_filter = if authenticated {
        format!(
            r#"<span><label for="self_tasks">Only my tasks</label>
               <input type="checkbox" id="self_tasks" name="self_tasks" value="on"{}></span>"#,
            own_checked
        )
    } else {
        String::new()
    };

    let create_link = if authenticated {
        r#"<p><a href="/tasks/create">Create task</a></p>"#
    } else {
        ""
    };

    let mut rows = String::new();
    for task in tasks {
        let labels_html: String = task
            .labels
            .iter()
            .map(|l| format!(r#"<span class="badge">{}</span> "#, html_escape(&l.name)))
            .collect();

        rows.push_str(&format!(
            r#"<tr><td>{0}</td><td><a href="/tasks/{0}">{1}</a></td><td>{2}</td>
               <td>{3}</td><td>{4}</td><td>{5}</td><td>{6}</td></tr>"#,
            task.id,
            html_escape(&task.name),
            html_escape(&task.status_name),
            html_escape(&task.author_name),
            html_escape(task.executor_name.as_deref().unwrap_or("")),
            labels_html,
            format_ts(task.created_at)
        ));
    }

    format!(
        r#"<h1>Tasks</h1>
{create_link}
<form class="filter" method="get" action="/tasks">
  <span><label for="status">Status</label>
  <select id="status" name="status">{status_options}</select></span>
  <span><label for="executor">Executor</label>
  <select id="executor" name="executor">{executor_options}</select></span>
  <span><label for="label">Label</label>
  <select id="label" name="label">{label_options}</select></span>
  {own_filter}
  <button>Show</button>
</form>
<table>
<thead><tr><th>ID</th><th>Name</th><th>Status</th><th>Author</th><th>Executor</th>
<th>Labels</th><th>Created</th></tr></thead>
<tbody>{rows}</tbody>
</table>"#,
        create_link = create_link,
        status_options = select_options(&status_options, filter.status),
        executor_options = select_options(&executor_options, filter.executor),
        label_options = select_options(&label_options, filter.label),
        own_filter = own_filter,
        rows = rows,
    )
}

pub fn task_detail_body(task: &Task) -> String {
    let labels_html: String = task
        .labels
        .iter()
        .map(|l| format!(r#"<span class="badge">{}</span> "#, html_escape(&l.name)))
        .collect();

    format!(
        r#"<h1>{name}</h1>
<table>
<tr><th>Author</th><td>{author}</td></tr>
<tr><th>Executor</th><td>{executor}</td></tr>
<tr><th>Status</th><td>{status}</td></tr>
<tr><th>Labels</th><td>{labels}</td></tr>
<tr><th>Created</th><td>{created}</td></tr>
<tr><th>Description</th><td>{description}</td></tr>
</table>
<p class="actions">
  <a href="/tasks/{id}/update">Edit</a>
  <a href="/tasks/{id}/delete">Delete</a>
</p>"#,
        name = html_escape(&task.name),
        author = html_escape(&task.author_name),
        executor = html_escape(task.executor_name.as_deref().unwrap_or("")),
        status = html_escape(&task.status_name),
        labels = labels_html,
        created = format_ts(task.created_at),
        description = html_escape(&task.description),
        id = task.id,
    )
}

/// Task create/update form.
#[allow(clippy::too_many_arguments)]
pub fn task_form_body(
    heading: &str,
    action: &str,
    name: &str,
    description: &str,
    status_id: Option<i64>,
    executor_id: Option<i64>,
    selected_labels: &[i64],
    statuses: &[Status],
    users: &[User],
    labels: &[Label],
    error: Option<&str>,
) -> String {
    let error_html = error
        .map(|e| format!(r#"<div class="flash flash-error">{}</div>"#, html_escape(e)))
        .unwrap_or_default();

    let status_options: Vec<(i64, String)> =
        statuses.iter().map(|s| (s.id, s.name.clone())).collect();
    let executor_options: Vec<(i64, String)> =
        users.iter().map(|u| (u.id, u.full_name())).collect();

    let mut label_options = String::new();
    for label in labels {
        let sel = if selected_labels.contains(&label.id) {
            " selected"
        } else {
            ""
        };
        label_options.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            label.id,
            sel,
            html_escape(&label.name)
        ));
    }

    format!(
        r#"<h1>{heading}</h1>
{error_html}
<form class="panel" method="post" action="{action}">
  <label for="name">Name</label>
  <input type="text" id="name" name="name" value="{name}" required>
  <label for="description">Description</label>
  <textarea id="description" name="description" rows="4">{description}</textarea>
  <label for="status">Status</label>
  <select id="status" name="status" required>{status_options}</select>
  <label for="executor">Executor</label>
  <select id="executor" name="executor">{executor_options}</select>
  <label for="labels">Labels</label>
  <select id="labels" name="labels" multiple size="4">{label_options}</select>
  <button>Save</button>
</form>"#,
        heading = html_escape(heading),
        error_html = error_html,
        action = html_escape(action),
        name = html_escape(name),
        description = html_escape(description),
        status_options = select_options(&status_options, status_id),
        executor_options = select_options(&executor_options, executor_id),
        label_options = label_options,
    )
}

pub fn not_found_body() -> String {
    r#"<h1>Not found</h1>
<p>The page or record you requested does not exist.</p>"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_html_metacharacters() {
        assert_eq!(
            html_escape(r#"<b>"x" & 'y'</b>"#),
            "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn page_escapes_user_content() {
        let body = named_form_body("Edit", "/statuses/1/update", "<script>", None);
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }
}
