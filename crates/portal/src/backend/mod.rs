//! Contract with the external data service.
//!
//! Everything the portal persists or authenticates goes through
//! [`DataService`]: table rows, resume files, user accounts and the push
//! channel for new rows. Two implementations exist:
//!
//! - [`SupabaseClient`] talks to a hosted Supabase project over REST and the
//!   Realtime websocket.
//! - [`MemoryBackend`] keeps everything in process. It backs local development
//!   (`PORTAL_BACKEND=memory`) and the router tests, and records every call so
//!   tests can assert what reached the service.
//!
//! Rows cross this boundary as untyped JSON; the [`crate::db`] repositories
//! decode them into `jack_machine_core` models.

pub mod memory;
pub mod supabase;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jack_machine_core::{SignupIdentifier, UserId, UserRole};

pub use memory::MemoryBackend;
pub use supabase::SupabaseClient;

/// An untyped table row.
pub type Row = serde_json::Value;

/// Stream of rows pushed by the data service.
pub type RowStream = BoxStream<'static, Result<Row, BackendError>>;

/// Errors from the external data service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (DNS, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No row matched the given id.
    #[error("Row not found")]
    NotFound,

    /// The push channel failed or was refused.
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// Message suitable for an inline error banner.
    ///
    /// Provider messages (bad credentials, duplicate sign-up, ...) are shown
    /// as-is; transport and decoding failures get a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::NotFound => "The requested record no longer exists.".to_string(),
            Self::Http(_) | Self::Realtime(_) | Self::Url(_) => {
                "The data service is unreachable. Please try again.".to_string()
            }
            Self::Decode(_) => "The data service returned an unexpected response.".to_string(),
        }
    }

    /// Whether the provider rejected the caller's credentials or token.
    #[must_use]
    pub const fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Api { status: 400 | 401 | 403, .. })
    }
}

// =============================================================================
// Row queries
// =============================================================================

/// Sort direction for [`RowQuery::order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Equality filters, one ordering and an optional limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    pub filters: Vec<(String, String)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl RowQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows whose `column` equals `value` (compared as text).
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    #[must_use]
    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Newest rows first by `created_at`.
    #[must_use]
    pub fn newest_first() -> Self {
        Self::new().order_desc("created_at")
    }
}

// =============================================================================
// Auth types
// =============================================================================

/// Profile fields the portal writes into the provider's user metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Provider-controlled account metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// An account as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub app_metadata: AppMetadata,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// Name shown in navigation and greetings.
    #[must_use]
    pub fn display_name(&self) -> String {
        let from_metadata = self
            .user_metadata
            .display_name
            .as_deref()
            .or(self.user_metadata.full_name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if let Some(name) = from_metadata {
            return name.to_string();
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            return email.split('@').next().unwrap_or(email).to_string();
        }
        self.phone.clone().unwrap_or_else(|| "there".to_string())
    }

    /// Role granted through `app_metadata.role`. Only the provider's admin API can set it.
    #[must_use]
    pub fn metadata_role(&self) -> UserRole {
        self.app_metadata
            .role
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or_default()
    }
}

/// Tokens and user returned by a successful sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) when `access_token` expires.
    pub expires_at: i64,
    pub user: AuthUser,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Input to [`DataService::sign_up`].
#[derive(Clone)]
pub struct SignUpRequest {
    pub identifier: SignupIdentifier,
    pub password: String,
    pub display_name: String,
    /// Where the confirmation link sends the user.
    pub email_redirect_to: String,
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("identifier", &self.identifier)
            .field("password", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The provider auto-confirmed the account and issued a session.
    SignedIn(AuthSession),
    /// The account exists but must be confirmed from the email first.
    ConfirmationRequired(AuthUser),
}

/// Supported OAuth identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            _ => Err(()),
        }
    }
}

// =============================================================================
// DataService
// =============================================================================

/// Everything the portal needs from the external data service.
#[async_trait]
pub trait DataService: Send + Sync + 'static {
    // ---- rows ----

    /// Fetch rows of `table` matching `query`.
    async fn select(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>, BackendError>;

    /// Count rows of `table` matching the query's filters.
    async fn count(&self, table: &str, query: &RowQuery) -> Result<u64, BackendError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError>;

    /// Patch the row with `id` and return it as stored.
    async fn update(&self, table: &str, id: i64, patch: Row) -> Result<Row, BackendError>;

    /// Delete the row with `id`.
    async fn delete(&self, table: &str, id: i64) -> Result<(), BackendError>;

    // ---- storage ----

    /// Store an object and return the key it was stored under.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError>;

    /// Time-limited download link for a stored object.
    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, BackendError>;

    /// Fetch a stored object's bytes.
    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BackendError>;

    // ---- auth ----

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError>;

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, BackendError>;

    /// URL to send the browser to for an OAuth (PKCE) sign-in.
    fn oauth_authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, BackendError>;

    /// Exchange the OAuth callback code for a session.
    async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, BackendError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError>;

    async fn update_display_name(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> Result<AuthUser, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError>;

    async fn resend_signup(&self, email: &str, redirect_to: &str) -> Result<(), BackendError>;

    /// Email a one-time sign-in link. The link returns to `redirect_to` with
    /// a code that [`DataService::exchange_code`] accepts for this challenge.
    async fn send_magic_link(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), BackendError>;

    // ---- push ----

    /// Stream of rows inserted into `table` from now on.
    async fn subscribe_inserts(&self, table: &str) -> Result<RowStream, BackendError>;

    /// Cheap reachability check for the readiness probe.
    async fn ping(&self) -> Result<(), BackendError>;
}

/// Unix timestamp `expires_in` seconds from now.
pub(crate) fn expiry_from_now(expires_in: i64) -> i64 {
    Utc::now().timestamp() + expires_in
}
