//! Table access through PostgREST.

use reqwest::Method;
use tracing::instrument;
use url::Url;

use super::{SupabaseClient, check};
use crate::backend::{BackendError, Row, RowQuery};

impl SupabaseClient {
    /// `/rest/v1/{table}` with the query encoded PostgREST-style.
    fn table_url(&self, table: &str, query: &RowQuery) -> Result<Url, BackendError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for (column, value) in &query.filters {
                pairs.append_pair(column, &format!("eq.{value}"));
            }
            if let Some(order) = &query.order {
                let direction = if order.ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{direction}", order.column));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    fn row_url(&self, table: &str, id: i64) -> Result<Url, BackendError> {
        self.table_url(table, &RowQuery::new().eq("id", id))
    }

    #[instrument(skip(self, query))]
    pub(super) async fn rest_select(
        &self,
        table: &str,
        query: &RowQuery,
    ) -> Result<Vec<Row>, BackendError> {
        let url = self.table_url(table, query)?;
        let response = self.data_request(Method::GET, url).send().await?;
        let body = check(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip(self, query))]
    pub(super) async fn rest_count(
        &self,
        table: &str,
        query: &RowQuery,
    ) -> Result<u64, BackendError> {
        let counting = RowQuery {
            filters: query.filters.clone(),
            order: None,
            limit: Some(1),
        };
        let url = self.table_url(table, &counting)?;
        let response = self
            .data_request(Method::GET, url)
            .header("Prefer", "count=exact")
            .send()
            .await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        check(response).await?;

        range
            .as_deref()
            .and_then(parse_content_range_total)
            .ok_or_else(|| BackendError::Api {
                status: 200,
                message: "Count response had no Content-Range total".to_string(),
            })
    }

    #[instrument(skip(self, row))]
    pub(super) async fn rest_insert(&self, table: &str, row: &Row) -> Result<Row, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let response = self
            .data_request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        first_row(&check(response).await?)
    }

    #[instrument(skip(self, patch))]
    pub(super) async fn rest_update(
        &self,
        table: &str,
        id: i64,
        patch: &Row,
    ) -> Result<Row, BackendError> {
        let url = self.row_url(table, id)?;
        let response = self
            .data_request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        first_row(&check(response).await?)
    }

    #[instrument(skip(self))]
    pub(super) async fn rest_delete(&self, table: &str, id: i64) -> Result<(), BackendError> {
        let url = self.row_url(table, id)?;
        let response = self
            .data_request(Method::DELETE, url)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        first_row(&check(response).await?).map(|_| ())
    }
}

/// First element of a `return=representation` array; empty means no row matched.
fn first_row(body: &str) -> Result<Row, BackendError> {
    let rows: Vec<Row> = serde_json::from_str(body)?;
    rows.into_iter().next().ok_or(BackendError::NotFound)
}

/// Total from a `Content-Range` header such as `0-0/42` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::backend::DataService;
    use crate::backend::supabase::test_support::{self, SERVICE_KEY};

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-0/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-0/*"), None);
    }

    #[tokio::test]
    async fn test_select_encodes_filters_and_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/applications"))
            .and(query_param("select", "*"))
            .and(query_param("user_id", "eq.abc"))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", SERVICE_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_support::client(&server.uri(), true);
        let rows = client
            .select("applications", &RowQuery::newest_first().eq("user_id", "abc"))
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({"id": 1})]);
    }

    #[tokio::test]
    async fn test_count_reads_content_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_messages"))
            .and(header("Prefer", "count=exact"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Range", "0-0/7")
                    .set_body_json(json!([{"id": 1}])),
            )
            .mount(&server)
            .await;

        let client = test_support::client(&server.uri(), false);
        assert_eq!(client.count("user_messages", &RowQuery::new()).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_insert_returns_stored_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_messages"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(json!({"name": "Jane"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([{"id": 9, "name": "Jane"}])),
            )
            .mount(&server)
            .await;

        let client = test_support::client(&server.uri(), false);
        let row = client
            .insert("user_messages", json!({"name": "Jane"}))
            .await
            .unwrap();
        assert_eq!(row["id"], 9);
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/applications"))
            .and(query_param("id", "eq.404"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = test_support::client(&server.uri(), false);
        let err = client
            .update("applications", 404, json!({"status": "approved"}))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn test_provider_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/services"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": "42501",
                "message": "permission denied for table services"
            })))
            .mount(&server)
            .await;

        let client = test_support::client(&server.uri(), false);
        let err = client.delete("services", 1).await.unwrap_err();
        assert_eq!(err.user_message(), "permission denied for table services");
    }
}
