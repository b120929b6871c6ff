//! Authentication route handlers.
//!
//! Handles password login, sign-up, password reset, magic links and the
//! OAuth (PKCE) round trip. Credentials are checked only by the provider;
//! its error messages are shown verbatim.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jack_machine_core::validation::{self, ValidationError};
use jack_machine_core::SignupIdentifier;

use crate::backend::{OAuthProvider, SignUpOutcome, SignUpRequest};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalUser, clear_auth_context, set_auth_context};
use crate::models::{AuthContext, SessionUser, session_keys};
use crate::services::auth::{PkcePair, auth_context, safe_return_path};
use crate::state::AppState;

/// Where the public login sends everyone without a `next` path.
const USER_LANDING: &str = "/users/dashboard";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Single e-mail field (password reset, magic link).
#[derive(Debug, Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub email: String,
}

/// Sign-up form data.
#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/notice display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub notice: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthStartQuery {
    pub next: Option<String>,
}

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub viewer: Option<SessionUser>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub email: String,
    pub next: String,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub viewer: Option<SessionUser>,
    pub error: Option<String>,
    pub display_name: String,
    pub identifier: String,
}

impl LoginTemplate {
    fn with_error(email: String, error: String) -> Self {
        Self {
            viewer: None,
            error: Some(error),
            notice: None,
            email,
            next: String::new(),
        }
    }

    fn with_notice(email: String, notice: &str) -> Self {
        Self {
            viewer: None,
            error: None,
            notice: Some(notice.to_string()),
            email,
            next: String::new(),
        }
    }
}

/// `/login?error=...` with the message encoded.
fn login_error_redirect(message: &str) -> Response {
    Redirect::to(&format!("/login?error={}", urlencoding::encode(message))).into_response()
}

/// Rotate the session id and store the signed-in account.
pub(crate) async fn start_session(session: &Session, context: &AuthContext) -> Result<()> {
    session.cycle_id().await?;
    set_auth_context(session, context).await?;
    let role = context.user.role.to_string();
    add_breadcrumb("auth", "Signed in", Some(&[("role", role.as_str())]));
    Ok(())
}

/// Sign out at the provider (best effort) and drop the session.
pub(crate) async fn end_session(
    state: &AppState,
    session: &Session,
    context: Option<AuthContext>,
) -> Result<()> {
    if let Some(context) = context {
        if let Err(e) = state.data().sign_out(&context.access_token).await {
            tracing::warn!(error = %e, "Provider sign-out failed");
        }
    }
    clear_auth_context(session).await?;
    session.flush().await?;
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalUser(viewer): OptionalUser,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        viewer: viewer.map(|auth| auth.user),
        error: query.error,
        notice: query.notice,
        email: String::new(),
        next: safe_return_path(query.next.as_deref()).unwrap_or_default(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() || form.password.is_empty() {
        return Ok(LoginTemplate::with_error(
            email,
            "Email and password are required.".to_string(),
        )
        .into_response());
    }

    match state.data().sign_in_with_password(&email, &form.password).await {
        Ok(provider_session) => {
            let context = auth_context(provider_session, &state.config().admin_emails);
            start_session(&session, &context).await?;
            tracing::info!(user_id = %context.user.id, "User signed in");
            let next = safe_return_path(form.next.as_deref())
                .unwrap_or_else(|| USER_LANDING.to_string());
            Ok(Redirect::to(&next).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            Ok(LoginTemplate::with_error(email, e.user_message()).into_response())
        }
    }
}

/// Send a password reset e-mail.
#[instrument(skip(state, form))]
pub async fn reset_password(State(state): State<AppState>, Form(form): Form<EmailForm>) -> Response {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() {
        return LoginTemplate::with_error(
            email,
            "Please enter your email address first".to_string(),
        )
        .into_response();
    }

    let redirect_to = state.config().absolute_url("/login");
    match state
        .data()
        .reset_password_for_email(&email, &redirect_to)
        .await
    {
        Ok(()) => LoginTemplate::with_notice(email, "Password reset link sent to your email!")
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Password reset failed");
            LoginTemplate::with_error(email, e.user_message()).into_response()
        }
    }
}

/// Send a one-time sign-in link.
#[instrument(skip(state, session, form))]
pub async fn magic_link(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<EmailForm>,
) -> Result<Response> {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() {
        return Ok(LoginTemplate::with_error(
            email,
            "Please enter your email address first".to_string(),
        )
        .into_response());
    }

    let pkce = PkcePair::generate();
    session
        .insert(session_keys::PKCE_VERIFIER, &pkce.verifier)
        .await?;

    let redirect_to = state.config().absolute_url("/auth/callback");
    match state
        .data()
        .send_magic_link(&email, &redirect_to, &pkce.challenge)
        .await
    {
        Ok(()) => Ok(
            LoginTemplate::with_notice(email, "Check your email for a sign-in link.")
                .into_response(),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Magic link failed");
            Ok(LoginTemplate::with_error(email, e.user_message()).into_response())
        }
    }
}

// =============================================================================
// OAuth Routes
// =============================================================================

/// Start an OAuth sign-in: remember the PKCE verifier and go to the provider.
#[instrument(skip(state, session))]
pub async fn oauth_start(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(query): Query<OAuthStartQuery>,
) -> Result<Response> {
    let provider: OAuthProvider = provider
        .parse()
        .map_err(|()| AppError::NotFound(format!("oauth provider {provider}")))?;

    let pkce = PkcePair::generate();
    session
        .insert(session_keys::PKCE_VERIFIER, &pkce.verifier)
        .await?;
    if let Some(next) = safe_return_path(query.next.as_deref()) {
        session.insert(session_keys::OAUTH_RETURN_TO, next).await?;
    }

    let redirect_to = state.config().absolute_url("/auth/callback");
    let url = state
        .data()
        .oauth_authorize_url(provider, &redirect_to, &pkce.challenge)?;
    Ok(Redirect::to(&url).into_response())
}

/// Exchange the code from an OAuth or magic-link redirect for a session.
#[instrument(skip(state, session, query))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    if let Some(error) = query.error {
        let message = query.error_description.unwrap_or(error);
        tracing::warn!(error = %message, "Provider returned an error");
        return Ok(login_error_redirect(&message));
    }
    let Some(code) = query.code else {
        return Ok(login_error_redirect("Sign-in was cancelled. Please try again."));
    };
    let Some(verifier) = session
        .remove::<String>(session_keys::PKCE_VERIFIER)
        .await?
    else {
        return Ok(login_error_redirect(
            "Your sign-in link has expired. Please try again.",
        ));
    };

    match state.data().exchange_code(&code, &verifier).await {
        Ok(provider_session) => {
            let context = auth_context(provider_session, &state.config().admin_emails);
            let next = session
                .remove::<String>(session_keys::OAUTH_RETURN_TO)
                .await?
                .unwrap_or_else(|| USER_LANDING.to_string());
            start_session(&session, &context).await?;
            tracing::info!(user_id = %context.user.id, "User signed in via callback");
            Ok(Redirect::to(&next).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Code exchange failed");
            Ok(login_error_redirect(&e.user_message()))
        }
    }
}

// =============================================================================
// Sign-up Routes
// =============================================================================

/// Display the sign-up page.
pub async fn signup_page(OptionalUser(viewer): OptionalUser) -> impl IntoResponse {
    SignupTemplate {
        viewer: viewer.map(|auth| auth.user),
        error: None,
        display_name: String::new(),
        identifier: String::new(),
    }
}

fn validate_signup(form: &SignupForm) -> std::result::Result<(String, SignupIdentifier), ValidationError> {
    let display_name = validation::required("Display name", &form.display_name)?;
    validation::max_len("Display name", &display_name, 80)?;
    let identifier = SignupIdentifier::parse(&form.identifier)?;
    validation::password(&form.password)?;
    Ok((display_name, identifier))
}

/// Handle sign-up form submission.
#[instrument(skip(state, session, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let rerender = |error: String, form: SignupForm| {
        SignupTemplate {
            viewer: None,
            error: Some(error),
            display_name: form.display_name,
            identifier: form.identifier,
        }
        .into_response()
    };

    let (display_name, identifier) = match validate_signup(&form) {
        Ok(valid) => valid,
        Err(e) => return Ok(rerender(e.to_string(), form)),
    };

    let request = SignUpRequest {
        identifier: identifier.clone(),
        password: form.password.clone(),
        display_name,
        email_redirect_to: state.config().absolute_url("/login"),
    };
    match state.data().sign_up(&request).await {
        Ok(SignUpOutcome::SignedIn(provider_session)) => {
            let context = auth_context(provider_session, &state.config().admin_emails);
            start_session(&session, &context).await?;
            tracing::info!(user_id = %context.user.id, "Account created and signed in");
            Ok(Redirect::to(USER_LANDING).into_response())
        }
        Ok(SignUpOutcome::ConfirmationRequired(user)) => {
            tracing::info!(user_id = %user.id, "Account created; confirmation pending");
            Ok(Redirect::to(&format!(
                "/users/verify-email?email={}",
                urlencoding::encode(&identifier.to_string())
            ))
            .into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            Ok(rerender(e.user_message(), form))
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out and return to the home page.
#[instrument(skip(state, session, viewer))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(viewer): OptionalUser,
) -> Result<Response> {
    end_session(&state, &session, viewer).await?;
    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(display_name: &str, identifier: &str, password: &str) -> SignupForm {
        SignupForm {
            display_name: display_name.to_string(),
            identifier: identifier.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_signup_phone_identifier_is_normalized() {
        let (_, identifier) = validate_signup(&form("Pat", "0015551234", "secret1")).unwrap();
        assert_eq!(identifier, SignupIdentifier::Phone("+15551234".to_string()));
    }

    #[test]
    fn test_signup_requires_display_name_and_password() {
        assert_eq!(
            validate_signup(&form(" ", "pat@example.com", "secret1")).unwrap_err(),
            ValidationError::Required {
                field: "Display name"
            }
        );
        assert!(matches!(
            validate_signup(&form("Pat", "pat@example.com", "abc")),
            Err(ValidationError::PasswordTooShort { .. })
        ));
    }
}
