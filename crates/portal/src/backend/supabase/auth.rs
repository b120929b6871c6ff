//! Account calls against GoTrue.

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::{SupabaseClient, check};
use crate::backend::{
    AuthSession, AuthUser, BackendError, SignUpOutcome, SignUpRequest, expiry_from_now,
};
use jack_machine_core::SignupIdentifier;

/// Body of a successful token grant.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        Self {
            expires_at: token
                .expires_at
                .unwrap_or_else(|| expiry_from_now(token.expires_in)),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user,
        }
    }
}

impl SupabaseClient {
    /// `POST /auth/v1/token?grant_type=...`
    #[instrument(skip(self, body))]
    pub(super) async fn token_grant(
        &self,
        grant_type: &str,
        body: &Value,
    ) -> Result<AuthSession, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let response = self
            .auth_request(Method::POST, url, None)
            .json(body)
            .send()
            .await?;
        let token: TokenResponse = serde_json::from_str(&check(response).await?)?;
        Ok(token.into())
    }

    #[instrument(skip(self, request), fields(identifier = %request.identifier))]
    pub(super) async fn auth_sign_up(
        &self,
        request: &SignUpRequest,
    ) -> Result<SignUpOutcome, BackendError> {
        let mut url = self.endpoint("auth/v1/signup")?;
        url.query_pairs_mut()
            .append_pair("redirect_to", &request.email_redirect_to);

        let mut body = json!({
            "password": request.password,
            "data": { "display_name": request.display_name },
        });
        match &request.identifier {
            SignupIdentifier::Email(email) => body["email"] = json!(email.as_str()),
            SignupIdentifier::Phone(phone) => body["phone"] = json!(phone),
        }

        let response = self
            .auth_request(Method::POST, url, None)
            .json(&body)
            .send()
            .await?;
        let value: Value = serde_json::from_str(&check(response).await?)?;
        parse_sign_up(value)
    }

    #[instrument(skip_all)]
    pub(super) async fn auth_get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .auth_request(Method::GET, url, Some(access_token))
            .send()
            .await?;
        Ok(serde_json::from_str(&check(response).await?)?)
    }

    #[instrument(skip(self, access_token))]
    pub(super) async fn auth_update_display_name(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> Result<AuthUser, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .auth_request(Method::PUT, url, Some(access_token))
            .json(&json!({ "data": { "display_name": display_name } }))
            .send()
            .await?;
        Ok(serde_json::from_str(&check(response).await?)?)
    }

    #[instrument(skip_all)]
    pub(super) async fn auth_sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .auth_request(Method::POST, url, Some(access_token))
            .send()
            .await?;
        check(response).await.map(|_| ())
    }

    /// Recovery, resend and magic-link calls share this shape.
    #[instrument(skip(self, body))]
    pub(super) async fn auth_email_action(
        &self,
        path: &str,
        redirect_to: &str,
        body: &Value,
    ) -> Result<(), BackendError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        let response = self
            .auth_request(Method::POST, url, None)
            .json(body)
            .send()
            .await?;
        check(response).await.map(|_| ())
    }
}

/// A sign-up answers with a session when the project auto-confirms and with
/// the bare user when confirmation is required.
fn parse_sign_up(value: Value) -> Result<SignUpOutcome, BackendError> {
    if value.get("access_token").is_some_and(|t| !t.is_null()) {
        let token: TokenResponse = serde_json::from_value(value)?;
        return Ok(SignUpOutcome::SignedIn(token.into()));
    }
    let user = match value.get("user") {
        Some(user) if user.is_object() => serde_json::from_value(user.clone())?,
        _ => serde_json::from_value(value)?,
    };
    Ok(SignUpOutcome::ConfirmationRequired(user))
}
