//! Not-found page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::filters;
use crate::models::SessionUser;

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "errors/404.html")]
pub struct NotFoundTemplate {
    pub viewer: Option<SessionUser>,
}

/// Render the 404 page.
#[must_use]
pub fn not_found_page() -> Response {
    (StatusCode::NOT_FOUND, NotFoundTemplate { viewer: None }).into_response()
}

/// Fallback for any path no route matches.
pub async fn fallback(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "No route matched");
    not_found_page()
}
