//! Authentication extractors.
//!
//! The signed-in account lives in the session as an [`AuthContext`]. These
//! extractors are the only place it is read: they refresh the provider token
//! when it is about to expire and drop the session context when the refresh
//! is refused, so handlers always see a usable identity or none.
//!
//! Extractors run before the handler body, so a rejected request never
//! reaches a protected fetch.

use axum::{
    extract::FromRequestParts,
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{AuthContext, session_keys};
use crate::services::auth::refresh_context;
use crate::state::AppState;

/// Extractor that requires a signed-in account of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireUser(auth): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", auth.user.username)
/// }
/// ```
pub struct RequireUser(pub AuthContext);

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub AuthContext);

/// Extractor that resolves the signed-in account if there is one.
pub struct OptionalUser(pub Option<AuthContext>);

/// Why an authenticated route turned the request away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session layer on this route.
    MissingSession,
    /// Not signed in; go to the user login page, then back to `next`.
    RedirectToLogin { next: Option<String> },
    /// Not signed in; go to the admin login page.
    RedirectToAdminLogin,
    /// Signed in without the admin role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Self::RedirectToLogin { next: None } => Redirect::to("/login").into_response(),
            Self::RedirectToLogin { next: Some(next) } => {
                Redirect::to(&format!("/login?next={}", urlencoding::encode(&next))).into_response()
            }
            Self::RedirectToAdminLogin => Redirect::to("/admin/login").into_response(),
            Self::Forbidden => Redirect::to("/admin/login?error=forbidden").into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        resolve(&session, state)
            .await
            .map(Self)
            .ok_or_else(|| AuthRejection::RedirectToLogin {
                next: return_path(parts),
            })
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        let context = resolve(&session, state)
            .await
            .ok_or(AuthRejection::RedirectToAdminLogin)?;
        if !context.user.is_admin() {
            tracing::warn!(user_id = %context.user.id, path = %parts.uri.path(), "Non-admin refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(context))
    }
}

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let context = match parts.extensions.get::<Session>().cloned() {
            Some(session) => resolve(&session, state).await,
            None => None,
        };
        Ok(Self(context))
    }
}

/// Page to come back to after signing in. Only page loads are resumed; a
/// form post cannot be replayed as a GET.
fn return_path(parts: &Parts) -> Option<String> {
    if parts.method != Method::GET {
        return None;
    }
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
}

fn session_from(parts: &Parts) -> Result<Session, AuthRejection> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::MissingSession)
}

/// Read the session context, refreshing the token if it is close to expiry.
async fn resolve(session: &Session, state: &AppState) -> Option<AuthContext> {
    let context: AuthContext = session
        .get(session_keys::AUTH)
        .await
        .ok()
        .flatten()?;

    if !context.needs_refresh(Utc::now().timestamp()) {
        return Some(context);
    }

    match refresh_context(state.data(), &context, &state.config().admin_emails).await {
        Ok(refreshed) => {
            if let Err(e) = set_auth_context(session, &refreshed).await {
                tracing::error!(error = %e, "Failed to store refreshed session");
            }
            Some(refreshed)
        }
        Err(e) => {
            tracing::info!(user_id = %context.user.id, error = %e, "Token refresh refused; signing out");
            if let Err(e) = clear_auth_context(session).await {
                tracing::error!(error = %e, "Failed to clear session");
            }
            None
        }
    }
}

/// Helper to store the signed-in account in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_auth_context(
    session: &Session,
    context: &AuthContext,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::AUTH, context).await?;
    set_sentry_user(&context.user.id, Some(&context.user.email));
    Ok(())
}

/// Helper to clear the signed-in account from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_auth_context(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<AuthContext>(session_keys::AUTH).await?;
    clear_sentry_user();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Request, header};

    use super::*;

    fn parts(method: Method, uri: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_return_path_keeps_page_loads_only() {
        assert_eq!(
            return_path(&parts(Method::GET, "/users/result?tab=all")).as_deref(),
            Some("/users/result?tab=all")
        );
        assert_eq!(return_path(&parts(Method::POST, "/users/profile")), None);
    }

    #[test]
    fn test_login_redirect_carries_encoded_next() {
        let response = AuthRejection::RedirectToLogin {
            next: Some("/users/result?tab=all".to_string()),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login?next=%2Fusers%2Fresult%3Ftab%3Dall"
        );

        let bare = AuthRejection::RedirectToLogin { next: None }.into_response();
        assert_eq!(bare.headers()[header::LOCATION], "/login");
    }
}
