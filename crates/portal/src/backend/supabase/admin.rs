//! Service-role account administration, used by `jm-cli admin`.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{SupabaseClient, check};
use crate::backend::{AuthUser, BackendError};
use jack_machine_core::{UserId, UserRole};

const PAGE_SIZE: u32 = 200;

#[derive(Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<AuthUser>,
}

impl SupabaseClient {
    fn require_service_role(&self) -> Result<&str, BackendError> {
        self.inner
            .service_role_key
            .as_deref()
            .ok_or_else(|| BackendError::Api {
                status: 403,
                message: "SUPABASE_SERVICE_ROLE_KEY is required for account administration"
                    .to_string(),
            })
    }

    /// One page of accounts, starting at page 1.
    ///
    /// # Errors
    ///
    /// Fails without a service-role key or when the request fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self, page: u32) -> Result<Vec<AuthUser>, BackendError> {
        let key = self.require_service_role()?;
        let mut url = self.endpoint("auth/v1/admin/users")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &PAGE_SIZE.to_string());
        let response = self
            .inner
            .http
            .get(url)
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await?;
        let page: UserPage = serde_json::from_str(&check(response).await?)?;
        Ok(page.users)
    }

    /// Find an account by email, walking every page.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when no account has that email.
    #[instrument(skip(self))]
    pub async fn find_user_by_email(&self, email: &str) -> Result<AuthUser, BackendError> {
        let wanted = email.trim().to_lowercase();
        let mut page = 1;
        loop {
            let users = self.list_users(page).await?;
            let exhausted = users.len() < PAGE_SIZE as usize;
            if let Some(user) = users
                .into_iter()
                .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(&wanted)))
            {
                return Ok(user);
            }
            if exhausted {
                return Err(BackendError::NotFound);
            }
            page += 1;
        }
    }

    /// Set `app_metadata.role` on an account.
    ///
    /// # Errors
    ///
    /// Fails without a service-role key or when the request fails.
    #[instrument(skip(self))]
    pub async fn set_role(&self, user_id: UserId, role: UserRole) -> Result<AuthUser, BackendError> {
        let key = self.require_service_role()?;
        let url = self.endpoint(&format!("auth/v1/admin/users/{user_id}"))?;
        let response = self
            .inner
            .http
            .request(Method::PUT, url)
            .header("apikey", key)
            .bearer_auth(key)
            .json(&json!({ "app_metadata": { "role": role.to_string() } }))
            .send()
            .await?;
        Ok(serde_json::from_str(&check(response).await?)?)
    }
}
