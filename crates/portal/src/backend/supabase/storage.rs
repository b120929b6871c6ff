//! Object storage for uploaded resumes.

use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use tracing::instrument;

use super::{SupabaseClient, api_error, check};
use crate::backend::BackendError;

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: String,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseClient {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub(super) async fn storage_upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{key}"))?;
        let response = self
            .data_request(Method::POST, url)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        let stored: UploadResponse = serde_json::from_str(&check(response).await?)?;

        let prefix = format!("{bucket}/");
        Ok(stored
            .key
            .strip_prefix(&prefix)
            .unwrap_or(&stored.key)
            .to_string())
    }

    #[instrument(skip(self))]
    pub(super) async fn storage_signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, BackendError> {
        let url = self.endpoint(&format!("storage/v1/object/sign/{bucket}/{key}"))?;
        let response = self
            .data_request(Method::POST, url)
            .json(&serde_json::json!({ "expiresIn": expires_in.as_secs() }))
            .send()
            .await?;
        let signed: SignResponse = serde_json::from_str(&check(response).await?)?;

        // The returned path is relative to the storage API root.
        let path = signed.signed_url.trim_start_matches('/');
        Ok(self.endpoint(&format!("storage/v1/{path}"))?.to_string())
    }

    #[instrument(skip(self))]
    pub(super) async fn storage_download(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<u8>, BackendError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{key}"))?;
        let response = self.data_request(Method::GET, url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await?;
            return Err(api_error(status, &body));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::backend::supabase::test_support;
    use crate::backend::{BackendError, DataService};

    #[tokio::test]
    async fn test_upload_returns_key_without_bucket() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/resumes/1700000000000_cv.pdf"))
            .and(header("x-upsert", "false"))
            .and(header("Content-Type", "application/pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Key": "resumes/1700000000000_cv.pdf"})),
            )
            .mount(&server)
            .await;

        let client = test_support::client(&server.uri(), true);
        let key = client
            .upload("resumes", "1700000000000_cv.pdf", b"%PDF".to_vec(), "application/pdf")
            .await
            .unwrap();
        assert_eq!(key, "1700000000000_cv.pdf");
    }

    #[tokio::test]
    async fn test_signed_url_is_absolute() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/sign/resumes/cv.pdf"))
            .and(body_json(json!({"expiresIn": 3600})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "signedURL": "/object/sign/resumes/cv.pdf?token=abc"
            })))
            .mount(&server)
            .await;

        let client = test_support::client(&server.uri(), true);
        let url = client
            .signed_url("resumes", "cv.pdf", std::time::Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(
            url,
            format!("{}/storage/v1/object/sign/resumes/cv.pdf?token=abc", server.uri())
        );
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/resumes/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_support::client(&server.uri(), true);
        let err = client.download("resumes", "missing.pdf").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }
}
