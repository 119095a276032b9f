//! HTTP server implementation.
//!
//! Routes dispatch to the entity handlers with an explicit identity
//! resolved from the session cookie, then map typed results onto the
//! form/redirect/flash flow of the site.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::forms::{form_value, form_values, is_truthy, parse_form, parse_ref_param};
use super::templates;
use crate::auth::{Identity, authenticate};
use crate::db::Database;
use crate::db::sessions::{FlashLevel, Session};
use crate::error::{AppError, ErrorCode};
use crate::handlers;
use crate::types::{TaskFilter, TaskInput, UserInput};

const SESSION_COOKIE: &str = "taskboard_session";

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
    session_ttl_ms: i64,
}

/// Everything resolved from the incoming session cookie.
struct RequestContext {
    session: Session,
    identity: Identity,
    /// A session was just created; the cookie must be (re)set.
    fresh: bool,
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key == SESSION_COOKIE).then(|| value.to_string())
    })
}

impl AppState {
    /// Resolve the session and identity for a request, creating an
    /// anonymous session when none is live.
    fn context(&self, headers: &HeaderMap) -> anyhow::Result<RequestContext> {
        if let Some(token) = cookie_token(headers) {
            if let Some(session) = self.db.get_session(&token)? {
                let identity = match session.user_id {
                    Some(user_id) => self
                        .db
                        .get_user(user_id)?
                        .map(Identity::authenticated)
                        .unwrap_or_else(Identity::anonymous),
                    None => Identity::anonymous(),
                };
                return Ok(RequestContext {
                    session,
                    identity,
                    fresh: false,
                });
            }
        }

        let session = self.db.create_session(None, self.session_ttl_ms)?;
        Ok(RequestContext {
            session,
            identity: Identity::anonymous(),
            fresh: true,
        })
    }

    fn cookie_header(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.session_ttl_ms / 1000
        )
    }
}

/// Attach the session cookie when the session was just created.
fn finish(state: &AppState, ctx: &RequestContext, mut response: Response) -> Response {
    if ctx.fresh {
        if let Ok(value) = header::HeaderValue::from_str(&state.cookie_header(&ctx.session.token)) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// Render a full page, consuming any pending flash messages.
fn render(state: &AppState, ctx: &RequestContext, title: &str, body: &str) -> Response {
    let flashes = state.db.take_flash(&ctx.session.token).unwrap_or_default();
    let html = templates::page(title, ctx.identity.user(), &flashes, body);
    finish(state, ctx, Html(html).into_response())
}

/// Queue a flash message and redirect.
fn flash_redirect(
    state: &AppState,
    ctx: &RequestContext,
    level: FlashLevel,
    message: &str,
    location: &str,
) -> Response {
    if let Err(e) = state.db.push_flash(&ctx.session.token, level, message) {
        warn!(error = %e, "Failed to store flash message");
    }
    finish(state, ctx, Redirect::to(location).into_response())
}

fn not_found(state: &AppState, ctx: &RequestContext) -> Response {
    let mut response = render(state, ctx, "Not found", &templates::not_found_body());
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    warn!(error = %err, "Request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

/// Bounce anonymous visitors to the login screen, remembering where
/// they were headed. Returns `None` for authenticated users.
fn require_login(state: &AppState, ctx: &RequestContext, next: &str) -> Option<Response> {
    if ctx.identity.is_authenticated() {
        return None;
    }
    let location = format!("/login?next={}", urlencoding::encode(next));
    Some(flash_redirect(
        state,
        ctx,
        FlashLevel::Error,
        "You are not logged in. Please log in.",
        &location,
    ))
}

fn is_validation(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::MissingRequiredField | ErrorCode::InvalidFieldValue | ErrorCode::DuplicateName
    )
}

/// Shared fallback mapping for handler errors that the calling route
/// did not intercept: permission and conflict denials flash and
/// redirect, missing records 404, the rest 500.
fn error_fallback(
    state: &AppState,
    ctx: &RequestContext,
    err: AppError,
    list_url: &str,
    current_path: &str,
) -> Response {
    match err.code {
        ErrorCode::NotAuthenticated => {
            let location = format!("/login?next={}", urlencoding::encode(current_path));
            flash_redirect(state, ctx, FlashLevel::Error, &err.message, &location)
        }
        ErrorCode::Forbidden | ErrorCode::InUse => {
            flash_redirect(state, ctx, FlashLevel::Error, &err.message, list_url)
        }
        ErrorCode::UserNotFound
        | ErrorCode::StatusNotFound
        | ErrorCode::LabelNotFound
        | ErrorCode::TaskNotFound => not_found(state, ctx),
        _ if is_validation(err.code) => {
            flash_redirect(state, ctx, FlashLevel::Error, &err.message, list_url)
        }
        _ => internal_error(err),
    }
}

/// Only same-site paths are allowed as post-login targets.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

macro_rules! ctx_or_500 {
    ($state:expr, $headers:expr) => {
        match $state.context(&$headers) {
            Ok(ctx) => ctx,
            Err(e) => return internal_error(e),
        }
    };
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_form).post(login))
        .route("/logout", post(logout))
        .route("/users", get(users_list))
        .route("/users/create", get(user_create_form).post(user_create))
        .route("/users/{id}/update", get(user_update_form).post(user_update))
        .route("/users/{id}/delete", get(user_delete_form).post(user_delete))
        .route("/statuses", get(statuses_list))
        .route("/statuses/create", get(status_create_form).post(status_create))
        .route(
            "/statuses/{id}/update",
            get(status_update_form).post(status_update),
        )
        .route(
            "/statuses/{id}/delete",
            get(status_delete_form).post(status_delete),
        )
        .route("/labels", get(labels_list))
        .route("/labels/create", get(label_create_form).post(label_create))
        .route(
            "/labels/{id}/update",
            get(label_update_form).post(label_update),
        )
        .route(
            "/labels/{id}/delete",
            get(label_delete_form).post(label_delete),
        )
        .route("/tasks", get(tasks_list))
        .route("/tasks/create", get(task_create_form).post(task_create))
        .route("/tasks/{id}", get(task_detail))
        .route("/tasks/{id}/update", get(task_update_form).post(task_update))
        .route("/tasks/{id}/delete", get(task_delete_form).post(task_delete))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and serve until shutdown.
pub async fn start_server(
    db: Arc<Database>,
    host: &str,
    port: u16,
    session_ttl_ms: i64,
) -> anyhow::Result<()> {
    let state = AppState { db, session_ttl_ms };
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Home and authentication
// ============================================================================

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = ctx_or_500!(state, headers);
    render(&state, &ctx, "Home", &templates::index_body())
}

#[derive(Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

async fn login_form(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    if ctx.identity.is_authenticated() {
        return finish(&state, &ctx, Redirect::to("/").into_response());
    }
    render(
        &state,
        &ctx,
        "Log in",
        &templates::login_body(query.next.as_deref(), None),
    )
}

async fn login(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let pairs = parse_form(&body);
    let username = form_value(&pairs, "username").unwrap_or("");
    let password = form_value(&pairs, "password").unwrap_or("");
    let next = form_value(&pairs, "next");

    let user = match authenticate(&state.db, username, password) {
        Ok(user) => user,
        Err(e) => return internal_error(e),
    };

    let Some(user) = user else {
        return render(
            &state,
            &ctx,
            "Log in",
            &templates::login_body(next, Some("Invalid username or password.")),
        );
    };

    // Rotate the session token on login; pending flash carries over.
    let session = match state
        .db
        .rotate_session(Some(&ctx.session.token), user.id, state.session_ttl_ms)
    {
        Ok(session) => session,
        Err(e) => return internal_error(e),
    };

    if let Err(e) = state
        .db
        .push_flash(&session.token, FlashLevel::Success, "You are logged in")
    {
        warn!(error = %e, "Failed to store flash message");
    }

    let mut response = Redirect::to(safe_next(next)).into_response();
    if let Ok(value) = header::HeaderValue::from_str(&state.cookie_header(&session.token)) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = ctx_or_500!(state, headers);

    if let Err(e) = state.db.delete_session(&ctx.session.token) {
        warn!(error = %e, "Failed to delete session");
    }

    let session = match state.db.create_session(None, state.session_ttl_ms) {
        Ok(session) => session,
        Err(e) => return internal_error(e),
    };
    if let Err(e) = state
        .db
        .push_flash(&session.token, FlashLevel::Success, "You are logged out")
    {
        warn!(error = %e, "Failed to store flash message");
    }

    let mut response = Redirect::to("/").into_response();
    if let Ok(value) = header::HeaderValue::from_str(&state.cookie_header(&session.token)) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

// ============================================================================
// Users
// ============================================================================

async fn users_list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = ctx_or_500!(state, headers);
    match handlers::users::list(&state.db) {
        Ok(users) => render(
            &state,
            &ctx,
            "Users",
            &templates::users_body(&users, ctx.identity.user_id()),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/users", "/users"),
    }
}

async fn user_create_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = ctx_or_500!(state, headers);
    render(
        &state,
        &ctx,
        "Sign up",
        &templates::user_form_body("Sign up", "/users/create", "Register", "", "", "", "", None),
    )
}

/// Read the shared user form, enforcing password confirmation.
fn read_user_form(pairs: &[(String, String)]) -> Result<UserInput, String> {
    let password = form_value(pairs, "password").map(String::from);
    let confirm = form_value(pairs, "password_confirm").map(String::from);
    if password != confirm {
        return Err("The passwords do not match.".to_string());
    }

    Ok(UserInput {
        username: form_value(pairs, "username").unwrap_or("").to_string(),
        first_name: form_value(pairs, "first_name").unwrap_or("").to_string(),
        last_name: form_value(pairs, "last_name").unwrap_or("").to_string(),
        email: form_value(pairs, "email").map(String::from),
        password,
    })
}

fn user_form_with_error(
    state: &AppState,
    ctx: &RequestContext,
    heading: &str,
    action: &str,
    submit: &str,
    input: &UserInput,
    error: &str,
) -> Response {
    render(
        state,
        ctx,
        heading,
        &templates::user_form_body(
            heading,
            action,
            submit,
            &input.username,
            &input.first_name,
            &input.last_name,
            input.email.as_deref().unwrap_or(""),
            Some(error),
        ),
    )
}

async fn user_create(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let pairs = parse_form(&body);

    let input = match read_user_form(&pairs) {
        Ok(input) => input,
        Err(message) => {
            let input = UserInput {
                username: form_value(&pairs, "username").unwrap_or("").to_string(),
                ..Default::default()
            };
            return user_form_with_error(
                &state,
                &ctx,
                "Sign up",
                "/users/create",
                "Register",
                &input,
                &message,
            );
        }
    };

    match handlers::users::register(&state.db, &input) {
        Ok(_) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "User registered successfully",
            "/login",
        ),
        Err(e) if is_validation(e.code) => user_form_with_error(
            &state,
            &ctx,
            "Sign up",
            "/users/create",
            "Register",
            &input,
            &e.message,
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/users", "/users/create"),
    }
}

async fn user_update_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/users/{}/update", id);
    if let Some(response) = require_login(&state, &ctx, &path) {
        return response;
    }

    if ctx.identity.user_id() != Some(id) {
        return flash_redirect(
            &state,
            &ctx,
            FlashLevel::Error,
            "You do not have permission to modify another user.",
            "/users",
        );
    }

    match handlers::users::get(&state.db, id) {
        Ok(user) => render(
            &state,
            &ctx,
            "Edit user",
            &templates::user_form_body(
                "Edit user",
                &path,
                "Save",
                &user.username,
                &user.first_name,
                &user.last_name,
                user.email.as_deref().unwrap_or(""),
                None,
            ),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/users", &path),
    }
}

async fn user_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/users/{}/update", id);
    let pairs = parse_form(&body);

    let input = match read_user_form(&pairs) {
        Ok(input) => input,
        Err(message) => {
            let input = UserInput {
                username: form_value(&pairs, "username").unwrap_or("").to_string(),
                ..Default::default()
            };
            return user_form_with_error(&state, &ctx, "Edit user", &path, "Save", &input, &message);
        }
    };

    match handlers::users::update(&state.db, &ctx.identity, id, &input) {
        Ok(_) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "User updated successfully",
            "/users",
        ),
        Err(e) if is_validation(e.code) => {
            user_form_with_error(&state, &ctx, "Edit user", &path, "Save", &input, &e.message)
        }
        Err(e) => error_fallback(&state, &ctx, e, "/users", &path),
    }
}

async fn user_delete_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/users/{}/delete", id);
    if let Some(response) = require_login(&state, &ctx, &path) {
        return response;
    }

    if ctx.identity.user_id() != Some(id) {
        return flash_redirect(
            &state,
            &ctx,
            FlashLevel::Error,
            "You do not have permission to modify another user.",
            "/users",
        );
    }

    match handlers::users::get(&state.db, id) {
        Ok(user) => render(
            &state,
            &ctx,
            "Delete user",
            &templates::delete_confirm_body("Delete user", &path, &user.full_name()),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/users", &path),
    }
}

async fn user_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/users/{}/delete", id);

    match handlers::users::delete(&state.db, &ctx.identity, id) {
        Ok(()) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "User deleted successfully",
            "/users",
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/users", &path),
    }
}

// ============================================================================
// Statuses
// ============================================================================

async fn statuses_list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = ctx_or_500!(state, headers);
    match handlers::statuses::list(&state.db, &ctx.identity) {
        Ok(statuses) => render(&state, &ctx, "Statuses", &templates::statuses_body(&statuses)),
        Err(e) => error_fallback(&state, &ctx, e, "/statuses", "/statuses"),
    }
}

async fn status_create_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = ctx_or_500!(state, headers);
    if let Some(response) = require_login(&state, &ctx, "/statuses/create") {
        return response;
    }
    render(
        &state,
        &ctx,
        "Create status",
        &templates::named_form_body("Create status", "/statuses/create", "", None),
    )
}

async fn status_create(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let pairs = parse_form(&body);
    let name = form_value(&pairs, "name").unwrap_or("");

    match handlers::statuses::create(&state.db, &ctx.identity, name) {
        Ok(_) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "Status created successfully",
            "/statuses",
        ),
        Err(e) if is_validation(e.code) => render(
            &state,
            &ctx,
            "Create status",
            &templates::named_form_body("Create status", "/statuses/create", name, Some(&e.message)),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/statuses", "/statuses/create"),
    }
}

async fn status_update_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/statuses/{}/update", id);

    match handlers::statuses::get(&state.db, &ctx.identity, id) {
        Ok(status) => render(
            &state,
            &ctx,
            "Edit status",
            &templates::named_form_body("Edit status", &path, &status.name, None),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/statuses", &path),
    }
}

async fn status_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/statuses/{}/update", id);
    let pairs = parse_form(&body);
    let name = form_value(&pairs, "name").unwrap_or("");

    match handlers::statuses::update(&state.db, &ctx.identity, id, name) {
        Ok(_) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "Status updated successfully",
            "/statuses",
        ),
        Err(e) if is_validation(e.code) => render(
            &state,
            &ctx,
            "Edit status",
            &templates::named_form_body("Edit status", &path, name, Some(&e.message)),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/statuses", &path),
    }
}

async fn status_delete_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/statuses/{}/delete", id);

    match handlers::statuses::get(&state.db, &ctx.identity, id) {
        Ok(status) => render(
            &state,
            &ctx,
            "Delete status",
            &templates::delete_confirm_body("Delete status", &path, &status.name),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/statuses", &path),
    }
}

async fn status_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/statuses/{}/delete", id);

    match handlers::statuses::delete(&state.db, &ctx.identity, id) {
        Ok(()) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "Status deleted successfully",
            "/statuses",
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/statuses", &path),
    }
}

// ============================================================================
// Labels
// ============================================================================

async fn labels_list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = ctx_or_500!(state, headers);
    match handlers::labels::list(&state.db, &ctx.identity) {
        Ok(labels) => render(&state, &ctx, "Labels", &templates::labels_body(&labels)),
        Err(e) => error_fallback(&state, &ctx, e, "/labels", "/labels"),
    }
}

async fn label_create_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = ctx_or_500!(state, headers);
    if let Some(response) = require_login(&state, &ctx, "/labels/create") {
        return response;
    }
    render(
        &state,
        &ctx,
        "Create label",
        &templates::named_form_body("Create label", "/labels/create", "", None),
    )
}

async fn label_create(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let pairs = parse_form(&body);
    let name = form_value(&pairs, "name").unwrap_or("");

    match handlers::labels::create(&state.db, &ctx.identity, name) {
        Ok(_) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "Label created successfully",
            "/labels",
        ),
        Err(e) if is_validation(e.code) => render(
            &state,
            &ctx,
            "Create label",
            &templates::named_form_body("Create label", "/labels/create", name, Some(&e.message)),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/labels", "/labels/create"),
    }
}

async fn label_update_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/labels/{}/update", id);

    match handlers::labels::get(&state.db, &ctx.identity, id) {
        Ok(label) => render(
            &state,
            &ctx,
            "Edit label",
            &templates::named_form_body("Edit label", &path, &label.name, None),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/labels", &path),
    }
}

async fn label_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/labels/{}/update", id);
    let pairs = parse_form(&body);
    let name = form_value(&pairs, "name").unwrap_or("");

    match handlers::labels::update(&state.db, &ctx.identity, id, name) {
        Ok(_) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "Label updated successfully",
            "/labels",
        ),
        Err(e) if is_validation(e.code) => render(
            &state,
            &ctx,
            "Edit label",
            &templates::named_form_body("Edit label", &path, name, Some(&e.message)),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/labels", &path),
    }
}

async fn label_delete_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/labels/{}/delete", id);

    match handlers::labels::get(&state.db, &ctx.identity, id) {
        Ok(label) => render(
            &state,
            &ctx,
            "Delete label",
            &templates::delete_confirm_body("Delete label", &path, &label.name),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/labels", &path),
    }
}

async fn label_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/labels/{}/delete", id);

    match handlers::labels::delete(&state.db, &ctx.identity, id) {
        Ok(()) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "Label deleted successfully",
            "/labels",
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/labels", &path),
    }
}

// ============================================================================
// Tasks
// ============================================================================

#[derive(Deserialize)]
struct TaskListQuery {
    status: Option<String>,
    executor: Option<String>,
    label: Option<String>,
    self_tasks: Option<String>,
}

async fn tasks_list(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);

    let filter = TaskFilter {
        status: parse_ref_param(query.status.as_deref()),
        executor: parse_ref_param(query.executor.as_deref()),
        label: parse_ref_param(query.label.as_deref()),
        own_tasks: is_truthy(query.self_tasks.as_deref()),
    };

    let tasks = match handlers::tasks::list(&state.db, &ctx.identity, &filter) {
        Ok(tasks) => tasks,
        Err(e) => return error_fallback(&state, &ctx, e, "/tasks", "/tasks"),
    };

    // Filter dropdowns are visible to anonymous visitors too, so the
    // lookup lists come straight from the store.
    let (statuses, users, labels) = match (
        state.db.list_statuses(),
        state.db.list_users(),
        state.db.list_labels(),
    ) {
        (Ok(s), Ok(u), Ok(l)) => (s, u, l),
        _ => return internal_error("failed to load filter lookups"),
    };

    render(
        &state,
        &ctx,
        "Tasks",
        &templates::tasks_body(
            &tasks,
            &statuses,
            &users,
            &labels,
            &filter,
            ctx.identity.is_authenticated(),
        ),
    )
}

async fn task_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/tasks/{}", id);

    match handlers::tasks::detail(&state.db, &ctx.identity, id) {
        Ok(task) => render(&state, &ctx, &task.name, &templates::task_detail_body(&task)),
        Err(e) => error_fallback(&state, &ctx, e, "/tasks", &path),
    }
}

/// Read the task form into a `TaskInput`. A missing status comes back
/// as id 0, which the store rejects as an unknown status.
fn read_task_form(pairs: &[(String, String)]) -> TaskInput {
    TaskInput {
        name: form_value(pairs, "name").unwrap_or("").to_string(),
        description: form_value(pairs, "description").unwrap_or("").to_string(),
        status_id: parse_ref_param(form_value(pairs, "status")).unwrap_or(0),
        executor_id: parse_ref_param(form_value(pairs, "executor")),
        label_ids: form_values(pairs, "labels")
            .iter()
            .filter_map(|v| v.parse().ok())
            .collect(),
    }
}

fn render_task_form(
    state: &AppState,
    ctx: &RequestContext,
    heading: &str,
    action: &str,
    input: &TaskInput,
    error: Option<&str>,
) -> Response {
    let (statuses, users, labels) = match (
        state.db.list_statuses(),
        state.db.list_users(),
        state.db.list_labels(),
    ) {
        (Ok(s), Ok(u), Ok(l)) => (s, u, l),
        _ => return internal_error("failed to load form lookups"),
    };

    let status_id = if input.status_id > 0 {
        Some(input.status_id)
    } else {
        None
    };

    render(
        state,
        ctx,
        heading,
        &templates::task_form_body(
            heading,
            action,
            &input.name,
            &input.description,
            status_id,
            input.executor_id,
            &input.label_ids,
            &statuses,
            &users,
            &labels,
            error,
        ),
    )
}

async fn task_create_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = ctx_or_500!(state, headers);
    if let Some(response) = require_login(&state, &ctx, "/tasks/create") {
        return response;
    }
    render_task_form(
        &state,
        &ctx,
        "Create task",
        "/tasks/create",
        &TaskInput::default(),
        None,
    )
}

async fn task_create(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let input = read_task_form(&parse_form(&body));

    match handlers::tasks::create(&state.db, &ctx.identity, &input) {
        Ok(_) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "Task created successfully",
            "/tasks",
        ),
        Err(e) if is_validation(e.code) => render_task_form(
            &state,
            &ctx,
            "Create task",
            "/tasks/create",
            &input,
            Some(&e.message),
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/tasks", "/tasks/create"),
    }
}

async fn task_update_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/tasks/{}/update", id);

    match handlers::tasks::detail(&state.db, &ctx.identity, id) {
        Ok(task) => {
            let input = TaskInput {
                name: task.name.clone(),
                description: task.description.clone(),
                status_id: task.status_id,
                executor_id: task.executor_id,
                label_ids: task.labels.iter().map(|l| l.id).collect(),
            };
            render_task_form(&state, &ctx, "Edit task", &path, &input, None)
        }
        Err(e) => error_fallback(&state, &ctx, e, "/tasks", &path),
    }
}

async fn task_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/tasks/{}/update", id);
    let input = read_task_form(&parse_form(&body));

    match handlers::tasks::update(&state.db, &ctx.identity, id, &input) {
        Ok(_) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "Task updated successfully",
            "/tasks",
        ),
        Err(e) if is_validation(e.code) => {
            render_task_form(&state, &ctx, "Edit task", &path, &input, Some(&e.message))
        }
        Err(e) => error_fallback(&state, &ctx, e, "/tasks", &path),
    }
}

async fn task_delete_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/tasks/{}/delete", id);

    let task = match handlers::tasks::detail(&state.db, &ctx.identity, id) {
        Ok(task) => task,
        Err(e) => return error_fallback(&state, &ctx, e, "/tasks", &path),
    };

    if ctx.identity.user_id() != Some(task.author_id) {
        return flash_redirect(
            &state,
            &ctx,
            FlashLevel::Error,
            "Only the task's author can delete it",
            "/tasks",
        );
    }

    render(
        &state,
        &ctx,
        "Delete task",
        &templates::delete_confirm_body("Delete task", &path, &task.name),
    )
}

async fn task_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let ctx = ctx_or_500!(state, headers);
    let path = format!("/tasks/{}/delete", id);

    match handlers::tasks::delete(&state.db, &ctx.identity, id) {
        Ok(()) => flash_redirect(
            &state,
            &ctx,
            FlashLevel::Success,
            "Task deleted successfully",
            "/tasks",
        ),
        Err(e) => error_fallback(&state, &ctx, e, "/tasks", &path),
    }
}
