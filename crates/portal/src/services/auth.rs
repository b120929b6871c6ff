//! Session identity derived from the auth provider.
//!
//! Credentials are only ever checked by the provider. This module turns what
//! the provider returns into the [`AuthContext`] kept in the session, decides
//! the account's role, and produces the PKCE pair for OAuth sign-in.

use std::collections::HashSet;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use tracing::instrument;

use jack_machine_core::UserRole;

use crate::backend::{AuthSession, AuthUser, BackendError, DataService};
use crate::models::{AuthContext, SessionUser};

/// Role for an account: admin when the provider metadata says so or the
/// address is on the configured allowlist.
#[must_use]
pub fn resolve_role(user: &AuthUser, admin_emails: &HashSet<String>) -> UserRole {
    let allowlisted = user
        .email
        .as_deref()
        .is_some_and(|email| admin_emails.contains(&email.to_lowercase()));
    if allowlisted {
        UserRole::Admin
    } else {
        user.metadata_role()
    }
}

/// Identity stored in the session for a provider account.
#[must_use]
pub fn session_user(user: &AuthUser, admin_emails: &HashSet<String>) -> SessionUser {
    let email = user
        .email
        .clone()
        .filter(|e| !e.is_empty())
        .or_else(|| user.phone.clone())
        .unwrap_or_default();
    SessionUser {
        id: user.id,
        email,
        username: user.display_name(),
        role: resolve_role(user, admin_emails),
    }
}

/// Session context for a freshly issued provider session.
#[must_use]
pub fn auth_context(session: AuthSession, admin_emails: &HashSet<String>) -> AuthContext {
    AuthContext {
        user: session_user(&session.user, admin_emails),
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        expires_at: session.expires_at,
    }
}

/// Exchange the refresh token for new tokens and re-read the account.
///
/// # Errors
///
/// Returns `BackendError` if the provider refuses the refresh token or the
/// user lookup fails.
#[instrument(skip(data, context, admin_emails), fields(user_id = %context.user.id))]
pub async fn refresh_context(
    data: &dyn DataService,
    context: &AuthContext,
    admin_emails: &HashSet<String>,
) -> Result<AuthContext, BackendError> {
    let session = data.refresh_session(&context.refresh_token).await?;
    let user = data.get_user(&session.access_token).await?;
    Ok(AuthContext {
        user: session_user(&user, admin_emails),
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        expires_at: session.expires_at,
    })
}

/// PKCE verifier and its S256 challenge.
#[derive(Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh verifier from 32 random bytes.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 code challenge for a verifier.
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Accept only same-site relative paths as post-login destinations.
#[must_use]
pub fn safe_return_path(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.contains('\\'))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AppMetadata, UserMetadata};
    use jack_machine_core::UserId;

    fn user(email: &str, role: Option<&str>) -> AuthUser {
        AuthUser {
            id: UserId::new(uuid::Uuid::nil()),
            email: Some(email.to_string()),
            phone: None,
            user_metadata: UserMetadata {
                display_name: Some("Jane Doe".to_string()),
                full_name: None,
            },
            app_metadata: AppMetadata {
                role: role.map(String::from),
                provider: None,
            },
            email_confirmed_at: None,
        }
    }

    #[test]
    fn test_role_from_metadata_or_allowlist() {
        let none = HashSet::new();
        let allow: HashSet<String> = ["boss@jackmachine.com".to_string()].into();

        assert_eq!(resolve_role(&user("a@b.co", None), &none), UserRole::User);
        assert_eq!(resolve_role(&user("a@b.co", Some("admin")), &none), UserRole::Admin);
        assert_eq!(
            resolve_role(&user("Boss@JackMachine.com", None), &allow),
            UserRole::Admin
        );
    }

    #[test]
    fn test_session_user_falls_back_to_phone() {
        let mut u = user("", None);
        u.email = None;
        u.phone = Some("+15551234".to_string());
        let session_user = session_user(&u, &HashSet::new());
        assert_eq!(session_user.email, "+15551234");
        assert_eq!(session_user.username, "Jane Doe");
    }

    #[test]
    fn test_pkce_challenge_matches_rfc_example() {
        // RFC 7636 appendix B
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_pkce_pair_is_fresh() {
        let a = PkcePair::generate();
        let b = PkcePair::generate();
        assert_ne!(a.verifier, b.verifier);
        assert_eq!(a.verifier.len(), 43);
        assert_eq!(a.challenge, challenge_for(&a.verifier));
    }

    #[test]
    fn test_safe_return_path() {
        assert_eq!(
            safe_return_path(Some("/users/jobs")),
            Some("/users/jobs".to_string())
        );
        assert_eq!(safe_return_path(Some("//evil.example")), None);
        assert_eq!(safe_return_path(Some("https://evil.example")), None);
        assert_eq!(safe_return_path(None), None);
    }
}
