//! Supabase implementation of [`DataService`].
//!
//! # Endpoints
//!
//! | Concern  | Path                                 |
//! |----------|--------------------------------------|
//! | Rows     | `/rest/v1/{table}` (PostgREST)       |
//! | Storage  | `/storage/v1/object/{bucket}/{key}`  |
//! | Auth     | `/auth/v1/*` (GoTrue)                |
//! | Push     | `/realtime/v1/websocket` (Phoenix)   |
//!
//! Row and storage calls authenticate with the service-role key when one is
//! configured and fall back to the anon key otherwise. Auth calls always send
//! the anon key, plus the user's access token where the endpoint needs one.

mod admin;
mod auth;
mod realtime;
mod rest;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde_json::Value;
use url::Url;

use crate::config::SupabaseConfig;

use super::{
    AuthSession, AuthUser, BackendError, DataService, OAuthProvider, Row, RowQuery, RowStream,
    SignUpOutcome, SignUpRequest,
};

/// Longest slice of a provider response body that gets logged.
const LOGGED_BODY_CHARS: usize = 500;

/// Client for a Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    http: reqwest::Client,
    /// Project URL, always ending in `/`.
    base: Url,
    anon_key: String,
    service_role_key: Option<String>,
    realtime_enabled: bool,
}

impl SupabaseClient {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SupabaseConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("jack-machine-portal/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base = config.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                http,
                base,
                anon_key: config.anon_key.expose_secret().to_string(),
                service_role_key: config
                    .service_role_key
                    .as_ref()
                    .map(|k| k.expose_secret().to_string()),
                realtime_enabled: config.realtime_enabled,
            }),
        })
    }

    /// Whether a service-role key is configured.
    #[must_use]
    pub fn has_service_role(&self) -> bool {
        self.inner.service_role_key.is_some()
    }

    /// Absolute URL for a path relative to the project root.
    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base.join(path)?)
    }

    /// Key used for row and storage calls.
    fn data_key(&self) -> &str {
        self.inner
            .service_role_key
            .as_deref()
            .unwrap_or(&self.inner.anon_key)
    }

    /// Request authenticated with the data key.
    fn data_request(&self, method: Method, url: Url) -> RequestBuilder {
        let key = self.data_key();
        self.inner
            .http
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key)
    }

    /// Request to the auth service, optionally on behalf of a signed-in user.
    fn auth_request(&self, method: Method, url: Url, access_token: Option<&str>) -> RequestBuilder {
        let request = self
            .inner
            .http
            .request(method, url)
            .header("apikey", &self.inner.anon_key);
        match access_token {
            Some(token) => request.bearer_auth(token),
            None => request.bearer_auth(&self.inner.anon_key),
        }
    }
}

/// Read the body of a response, turning non-success statuses into errors.
async fn check(response: Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    Err(api_error(status, &body))
}

/// Log a failed provider response and convert it to an error.
fn api_error(status: reqwest::StatusCode, body: &str) -> BackendError {
    tracing::warn!(
        status = %status,
        body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
        "Supabase returned non-success status"
    );
    BackendError::Api {
        status: status.as_u16(),
        message: provider_message(body)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16())),
    }
}

/// Human-readable message from a provider error body.
///
/// GoTrue, PostgREST and Storage each use a different key for it.
fn provider_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl DataService for SupabaseClient {
    async fn select(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>, BackendError> {
        self.rest_select(table, query).await
    }

    async fn count(&self, table: &str, query: &RowQuery) -> Result<u64, BackendError> {
        self.rest_count(table, query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError> {
        self.rest_insert(table, &row).await
    }

    async fn update(&self, table: &str, id: i64, patch: Row) -> Result<Row, BackendError> {
        self.rest_update(table, id, &patch).await
    }

    async fn delete(&self, table: &str, id: i64) -> Result<(), BackendError> {
        self.rest_delete(table, id).await
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        self.storage_upload(bucket, key, bytes, content_type).await
    }

    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, BackendError> {
        self.storage_signed_url(bucket, key, expires_in).await
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BackendError> {
        self.storage_download(bucket, key).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        self.token_grant(
            "password",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, BackendError> {
        self.auth_sign_up(request).await
    }

    fn oauth_authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, BackendError> {
        let mut url = self.endpoint("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, BackendError> {
        self.token_grant(
            "pkce",
            &serde_json::json!({ "auth_code": auth_code, "code_verifier": code_verifier }),
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        self.token_grant(
            "refresh_token",
            &serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        self.auth_get_user(access_token).await
    }

    async fn update_display_name(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> Result<AuthUser, BackendError> {
        self.auth_update_display_name(access_token, display_name)
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.auth_sign_out(access_token).await
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        self.auth_email_action(
            "auth/v1/recover",
            redirect_to,
            &serde_json::json!({ "email": email }),
        )
        .await
    }

    async fn resend_signup(&self, email: &str, redirect_to: &str) -> Result<(), BackendError> {
        self.auth_email_action(
            "auth/v1/resend",
            redirect_to,
            &serde_json::json!({ "type": "signup", "email": email }),
        )
        .await
    }

    async fn send_magic_link(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), BackendError> {
        self.auth_email_action(
            "auth/v1/otp",
            redirect_to,
            &serde_json::json!({
                "email": email,
                "create_user": false,
                "code_challenge": code_challenge,
                "code_challenge_method": "s256",
            }),
        )
        .await
    }

    async fn subscribe_inserts(&self, table: &str) -> Result<RowStream, BackendError> {
        self.realtime_subscribe(table).await
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/health")?;
        let response = self.auth_request(Method::GET, url, None).send().await?;
        check(response).await.map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use secrecy::SecretString;
    use url::Url;

    use super::SupabaseClient;
    use crate::config::SupabaseConfig;

    pub const ANON_KEY: &str = "anon-test-key";
    pub const SERVICE_KEY: &str = "service-test-key";

    /// Client pointed at a mock server.
    #[allow(clippy::unwrap_used)]
    pub fn client(base: &str, service_role: bool) -> SupabaseClient {
        let config = SupabaseConfig {
            url: Url::parse(base).unwrap(),
            anon_key: SecretString::from(ANON_KEY.to_string()),
            service_role_key: service_role.then(|| SecretString::from(SERVICE_KEY.to_string())),
            resume_bucket: "resumes".to_string(),
            signed_url_ttl: std::time::Duration::from_secs(3600),
            realtime_enabled: true,
        };
        SupabaseClient::new(&config).unwrap()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_keys() {
        assert_eq!(
            provider_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            Some("Invalid login credentials".to_string())
        );
        assert_eq!(
            provider_message(r#"{"code":400,"msg":"User already registered"}"#),
            Some("User already registered".to_string())
        );
        assert_eq!(
            provider_message(r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#),
            Some("Object not found".to_string())
        );
        assert_eq!(provider_message("<html>"), None);
    }

    #[test]
    fn test_oauth_url_carries_pkce_challenge() {
        let client = test_support::client("https://project.supabase.co", false);
        let url = client
            .oauth_authorize_url(
                OAuthProvider::Google,
                "https://jackmachine.test/auth/callback",
                "challenge123",
            )
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.path(), "/auth/v1/authorize");
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("provider".to_string(), "google".to_string())));
        assert!(pairs.contains(&("code_challenge".to_string(), "challenge123".to_string())));
        assert!(pairs.contains(&("code_challenge_method".to_string(), "s256".to_string())));
    }
}
