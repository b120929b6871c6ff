//! Admin login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalUser;
use crate::routes::auth::{LoginForm, end_session, start_session};
use crate::services::auth::auth_context;
use crate::state::AppState;

const NOT_AN_ADMIN: &str = "This account does not have admin access.";

#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub error: Option<String>,
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminLoginQuery {
    pub error: Option<String>,
}

/// Display the admin login page; signed-in admins go straight to the dashboard.
pub async fn login_page(
    OptionalUser(viewer): OptionalUser,
    Query(query): Query<AdminLoginQuery>,
) -> Response {
    if viewer.as_ref().is_some_and(|auth| auth.user.is_admin()) {
        return Redirect::to("/admin/dashboard").into_response();
    }
    let error = query.error.map(|e| match e.as_str() {
        "forbidden" => NOT_AN_ADMIN.to_string(),
        _ => e,
    });
    AdminLoginTemplate {
        error,
        email: String::new(),
    }
    .into_response()
}

/// Password sign-in restricted to admin accounts.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let email = form.email.trim().to_lowercase();
    let rerender = |email: String, error: String| {
        AdminLoginTemplate {
            error: Some(error),
            email,
        }
        .into_response()
    };

    if email.is_empty() || form.password.is_empty() {
        return Ok(rerender(email, "Email and password are required.".to_string()));
    }

    let provider_session = match state.data().sign_in_with_password(&email, &form.password).await {
        Ok(provider_session) => provider_session,
        Err(e) => {
            tracing::warn!(error = %e, "Admin login failed");
            return Ok(rerender(email, e.user_message()));
        }
    };

    let context = auth_context(provider_session, &state.config().admin_emails);
    if !context.user.is_admin() {
        tracing::warn!(user_id = %context.user.id, "Non-admin account tried the admin login");
        end_session(&state, &session, Some(context)).await?;
        return Ok(rerender(email, NOT_AN_ADMIN.to_string()));
    }

    start_session(&session, &context).await?;
    tracing::info!(user_id = %context.user.id, "Admin signed in");
    Ok(Redirect::to(context.user.role.landing_path()).into_response())
}

/// Sign out and return to the admin login.
#[instrument(skip(state, session, viewer))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(viewer): OptionalUser,
) -> Result<Response> {
    end_session(&state, &session, viewer).await?;
    Ok(Redirect::to("/admin/login").into_response())
}
