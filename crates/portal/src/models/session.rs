//! Session-related types.
//!
//! Types stored in the session for authentication state.

use std::fmt;

use serde::{Deserialize, Serialize};

use jack_machine_core::{UserId, UserRole};

/// Seconds before expiry at which an access token is refreshed.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    /// Email address, or the phone number for phone sign-ups.
    pub email: String,
    /// Display name shown in navigation.
    pub username: String,
    pub role: UserRole,
}

impl SessionUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Everything the session keeps about a signed-in account.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user: SessionUser,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) when `access_token` expires.
    pub expires_at: i64,
}

impl AuthContext {
    /// Whether the access token expires within [`REFRESH_MARGIN_SECS`] of `now`.
    #[must_use]
    pub const fn needs_refresh(&self, now: i64) -> bool {
        self.expires_at - now <= REFRESH_MARGIN_SECS
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the signed-in account's [`super::AuthContext`].
    pub const AUTH: &str = "auth";

    /// Key for the PKCE verifier of an OAuth sign-in in flight.
    pub const PKCE_VERIFIER: &str = "pkce_verifier";

    /// Key for where to go after the OAuth callback.
    pub const OAUTH_RETURN_TO: &str = "oauth_return_to";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(expires_at: i64) -> AuthContext {
        AuthContext {
            user: SessionUser {
                id: UserId::new(uuid::Uuid::nil()),
                email: "pat@example.com".to_string(),
                username: "Pat".to_string(),
                role: UserRole::User,
            },
            access_token: "access-secret".to_string(),
            refresh_token: "refresh-secret".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_needs_refresh_within_margin() {
        let now = 1_000_000;
        assert!(!context(now + 3600).needs_refresh(now));
        assert!(!context(now + 61).needs_refresh(now));
        assert!(context(now + 60).needs_refresh(now));
        assert!(context(now - 5).needs_refresh(now));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", context(0));
        assert!(debug.contains("pat@example.com"));
        assert!(!debug.contains("access-secret"));
        assert!(!debug.contains("refresh-secret"));
    }
}
