//! Admin console.
//!
//! Every handler except the login page takes [`RequireAdmin`], so the gate
//! runs before any protected fetch.
//!
//! List pages load the whole table, newest first, and filter it in memory with
//! `?q=`. Row mutations answer a request carrying `X-Partial: true` with just
//! that row's fragment, rendered from the row the data service returned.
//! Plain form posts are redirected back to the list.
//!
//! [`RequireAdmin`]: crate::middleware::RequireAdmin

pub mod applications;
pub mod auth;
pub mod careers;
pub mod dashboard;
pub mod messages;
pub mod services;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::db::RepositoryError;
use crate::state::AppState;

/// Header set by the admin script when it wants only a row fragment back.
pub const PARTIAL_HEADER: &str = "x-partial";

/// Admin form bodies are small; anything larger is rejected.
const ADMIN_BODY_LIMIT: usize = 64 * 1024;

/// Whether the request asked for a row fragment instead of a redirect.
#[must_use]
pub fn wants_partial(headers: &HeaderMap) -> bool {
    headers
        .get(PARTIAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Query string shared by the admin list pages.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl ListQuery {
    /// The search box value as typed.
    #[must_use]
    pub fn search(&self) -> String {
        self.q.clone().unwrap_or_default()
    }
}

/// Redirect back to `path` with an error banner.
pub(crate) fn redirect_with_error(path: &str, message: &str) -> Response {
    Redirect::to(&format!("{path}?error={}", urlencoding::encode(message))).into_response()
}

/// Redirect back to `path` with a notice banner.
pub(crate) fn redirect_with_notice(path: &str, message: &str) -> Response {
    Redirect::to(&format!("{path}?notice={}", urlencoding::encode(message))).into_response()
}

/// Response to a successful delete: nothing for a partial, the list otherwise.
pub(crate) fn deleted(headers: &HeaderMap, list_path: &str, notice: &str) -> Response {
    if wants_partial(headers) {
        Html(String::new()).into_response()
    } else {
        redirect_with_notice(list_path, notice)
    }
}

/// A row mutation the data service refused.
///
/// Partial requests get the provider's message as the body with a matching
/// status; plain posts go back to the list with the error banner.
pub(crate) fn mutation_failed(headers: &HeaderMap, list_path: &str, err: &RepositoryError) -> Response {
    tracing::warn!(error = %err, path = list_path, "Admin mutation failed");
    if wants_partial(headers) {
        let status = match err {
            RepositoryError::NotFound => StatusCode::NOT_FOUND,
            RepositoryError::Validation(_) => StatusCode::BAD_REQUEST,
            RepositoryError::Backend(_) | RepositoryError::DataCorruption(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        (status, err.user_message()).into_response()
    } else {
        redirect_with_error(list_path, &err.user_message())
    }
}

/// Admin routes, nested under `/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        // Dashboard
        .route("/", get(dashboard::index))
        .route("/dashboard", get(dashboard::index))
        .route("/dashboard/events", get(dashboard::events))
        // Services
        .route("/services", get(services::index).post(services::create))
        .route("/services/new", get(services::new_form))
        .route("/services/{id}", post(services::update))
        .route("/services/{id}/edit", get(services::edit_form))
        .route("/services/{id}/delete", post(services::delete))
        // Careers
        .route("/careers", get(careers::index).post(careers::create))
        .route("/careers/new", get(careers::new_form))
        .route("/careers/{id}", post(careers::update))
        .route("/careers/{id}/edit", get(careers::edit_form))
        .route("/careers/{id}/delete", post(careers::delete))
        // Applications
        .route("/applications", get(applications::index))
        .route("/applications/{id}/status", post(applications::set_status))
        .route("/applications/{id}/resume", get(applications::resume))
        // Messages
        .route("/messages", get(messages::index))
        .route("/messages/{id}/read", post(messages::mark_read))
        .route("/messages/{id}/delete", post(messages::delete))
        .layer(DefaultBodyLimit::max(ADMIN_BODY_LIMIT))
}
