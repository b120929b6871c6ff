//! In-process data service.
//!
//! Keeps tables, stored objects and accounts in memory and records every call
//! made through [`DataService`]. Used for local development without a hosted
//! project and by the router tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use jack_machine_core::{SignupIdentifier, UserId, UserRole};

use super::{
    AppMetadata, AuthSession, AuthUser, BackendError, DataService, OAuthProvider, Row, RowQuery,
    RowStream, SignUpOutcome, SignUpRequest, UserMetadata,
};

/// Kind of call recorded by [`MemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Select,
    Count,
    Insert,
    Update,
    Delete,
    Upload,
    SignedUrl,
    Download,
    SignIn,
    SignUp,
    ExchangeCode,
    Refresh,
    GetUser,
    UpdateUser,
    SignOut,
    ResetPassword,
    ResendSignup,
    MagicLink,
    Subscribe,
    Ping,
}

/// One recorded call: what was done and to which table, bucket or account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub kind: CallKind,
    pub target: String,
}

#[derive(Clone)]
struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

const OAUTH_CODE: &str = "memory-oauth-code";
const OAUTH_EMAIL: &str = "oauth.user@example.com";
const TOKEN_TTL_SECS: i64 = 3600;

/// In-memory implementation of [`DataService`].
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    next_id: AtomicI64,
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    accounts: Mutex<HashMap<String, Account>>,
    access_tokens: Mutex<HashMap<String, String>>,
    refresh_tokens: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<BackendCall>>,
    failures: Mutex<HashMap<CallKind, String>>,
    auto_confirm: bool,
    inserts: broadcast::Sender<(String, Row)>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MemoryBackend {
    /// Backend whose sign-ups are confirmed immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::with_auto_confirm(true)
    }

    /// Backend that requires email confirmation when `auto_confirm` is false.
    #[must_use]
    pub fn with_auto_confirm(auto_confirm: bool) -> Self {
        let (inserts, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(MemoryInner {
                tables: Mutex::new(HashMap::new()),
                next_id: AtomicI64::new(1),
                objects: Mutex::new(HashMap::new()),
                accounts: Mutex::new(HashMap::new()),
                access_tokens: Mutex::new(HashMap::new()),
                refresh_tokens: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                failures: Mutex::new(HashMap::new()),
                auto_confirm,
                inserts,
            }),
        }
    }

    // =========================================================================
    // Test and seeding helpers (not recorded as calls)
    // =========================================================================

    /// Store a row as if another client inserted it, notifying subscribers.
    pub fn seed_row(&self, table: &str, row: Row) -> Row {
        let row = self.store_row(table, row);
        let _ = self.inner.inserts.send((table.to_string(), row.clone()));
        row
    }

    /// Create a confirmed account and return its id.
    pub fn add_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: UserRole,
    ) -> UserId {
        let user = AuthUser {
            id: UserId::new(Uuid::new_v4()),
            email: Some(email.to_lowercase()),
            phone: None,
            user_metadata: UserMetadata {
                display_name: Some(display_name.to_string()),
                full_name: None,
            },
            app_metadata: AppMetadata {
                role: (role == UserRole::Admin).then(|| "admin".to_string()),
                provider: Some("email".to_string()),
            },
            email_confirmed_at: Some(Utc::now()),
        };
        let id = user.id;
        lock(&self.inner.accounts).insert(
            email.to_lowercase(),
            Account {
                user,
                password: password.to_string(),
                confirmed: true,
            },
        );
        id
    }

    /// Every call made so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.inner.calls).clone()
    }

    /// Calls of one kind, oldest first.
    #[must_use]
    pub fn calls_of(&self, kind: CallKind) -> Vec<BackendCall> {
        lock(&self.inner.calls)
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.inner.calls).clear();
    }

    /// Make the next call of `kind` fail with a provider error.
    pub fn fail_next(&self, kind: CallKind, message: &str) {
        lock(&self.inner.failures).insert(kind, message.to_string());
    }

    /// Current contents of a table.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        lock(&self.inner.tables)
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Stored object bytes, if present.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.inner.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of live subscriptions to the insert channel.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.inserts.receiver_count()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn record(&self, kind: CallKind, target: &str) -> Result<(), BackendError> {
        lock(&self.inner.calls).push(BackendCall {
            kind,
            target: target.to_string(),
        });
        match lock(&self.inner.failures).remove(&kind) {
            Some(message) => Err(BackendError::Api {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }

    fn store_row(&self, table: &str, mut row: Row) -> Row {
        if let Some(object) = row.as_object_mut() {
            if !object.contains_key("id") {
                let id = self.inner.next_id.fetch_add(1, AtomicOrdering::SeqCst);
                object.insert("id".to_string(), id.into());
            }
            if !object.contains_key("created_at") {
                let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
                object.insert("created_at".to_string(), now.into());
            }
        }
        lock(&self.inner.tables)
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    fn issue_session(&self, user: AuthUser) -> AuthSession {
        let access_token = format!("mem-access-{}", Uuid::new_v4());
        let refresh_token = format!("mem-refresh-{}", Uuid::new_v4());
        let key = account_key(&user);
        lock(&self.inner.access_tokens).insert(access_token.clone(), key.clone());
        lock(&self.inner.refresh_tokens).insert(refresh_token.clone(), key);
        AuthSession {
            access_token,
            refresh_token,
            expires_at: super::expiry_from_now(TOKEN_TTL_SECS),
            user,
        }
    }

    fn account_for_token(&self, access_token: &str) -> Result<Account, BackendError> {
        let key = lock(&self.inner.access_tokens)
            .get(access_token)
            .cloned()
            .ok_or_else(invalid_token)?;
        lock(&self.inner.accounts)
            .get(&key)
            .cloned()
            .ok_or_else(invalid_token)
    }
}

fn account_key(user: &AuthUser) -> String {
    user.email
        .clone()
        .or_else(|| user.phone.clone())
        .unwrap_or_else(|| user.id.to_string())
}

fn invalid_token() -> BackendError {
    BackendError::Api {
        status: 401,
        message: "invalid JWT: unable to parse or verify signature".to_string(),
    }
}

/// Column value as the text an equality filter compares against.
fn as_filter_text(value: &Row) -> String {
    match value {
        Row::String(s) => s.clone(),
        Row::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn compare_values(a: Option<&Row>, b: Option<&Row>) -> Ordering {
    match (a, b) {
        (Some(Row::Number(a)), Some(Row::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Row::String(a)), Some(Row::String(b))) => a.cmp(b),
        (Some(Row::Bool(a)), Some(Row::Bool(b))) => a.cmp(b),
        (None | Some(Row::Null), None | Some(Row::Null)) => Ordering::Equal,
        (None | Some(Row::Null), Some(_)) => Ordering::Less,
        (Some(_), None | Some(Row::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn matches_filters(row: &Row, query: &RowQuery) -> bool {
    query.filters.iter().all(|(column, expected)| {
        row.get(column)
            .is_some_and(|value| as_filter_text(value) == *expected)
    })
}

fn row_id(row: &Row) -> Option<i64> {
    row.get("id").and_then(Row::as_i64)
}

#[async_trait]
impl DataService for MemoryBackend {
    async fn select(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>, BackendError> {
        self.record(CallKind::Select, table)?;
        let mut rows: Vec<Row> = self
            .rows(table)
            .into_iter()
            .filter(|row| matches_filters(row, query))
            .collect();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let by_column = compare_values(a.get(&order.column), b.get(&order.column))
                    .then_with(|| row_id(a).cmp(&row_id(b)));
                if order.ascending {
                    by_column
                } else {
                    by_column.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn count(&self, table: &str, query: &RowQuery) -> Result<u64, BackendError> {
        self.record(CallKind::Count, table)?;
        let count = self
            .rows(table)
            .iter()
            .filter(|row| matches_filters(row, query))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError> {
        self.record(CallKind::Insert, table)?;
        Ok(self.seed_row(table, row))
    }

    async fn update(&self, table: &str, id: i64, patch: Row) -> Result<Row, BackendError> {
        self.record(CallKind::Update, table)?;
        let mut tables = lock(&self.inner.tables);
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            .ok_or(BackendError::NotFound)?;
        if let (Some(target), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: i64) -> Result<(), BackendError> {
        self.record(CallKind::Delete, table)?;
        let mut tables = lock(&self.inner.tables);
        let rows = tables.get_mut(table).ok_or(BackendError::NotFound)?;
        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id));
        if rows.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, BackendError> {
        self.record(CallKind::Upload, &format!("{bucket}/{key}"))?;
        let mut objects = lock(&self.inner.objects);
        let slot = (bucket.to_string(), key.to_string());
        if objects.contains_key(&slot) {
            return Err(BackendError::Api {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        objects.insert(slot, bytes);
        Ok(key.to_string())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, BackendError> {
        self.record(CallKind::SignedUrl, &format!("{bucket}/{key}"))?;
        if self.object(bucket, key).is_none() {
            return Err(BackendError::NotFound);
        }
        Ok(format!(
            "memory://{bucket}/{key}?expires_in={}",
            expires_in.as_secs()
        ))
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BackendError> {
        self.record(CallKind::Download, &format!("{bucket}/{key}"))?;
        self.object(bucket, key).ok_or(BackendError::NotFound)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        self.record(CallKind::SignIn, email)?;
        let account = lock(&self.inner.accounts)
            .get(&email.trim().to_lowercase())
            .cloned()
            .filter(|a| a.password == password)
            .ok_or_else(|| BackendError::Api {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })?;
        if !account.confirmed {
            return Err(BackendError::Api {
                status: 400,
                message: "Email not confirmed".to_string(),
            });
        }
        Ok(self.issue_session(account.user))
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, BackendError> {
        let key = request.identifier.to_string();
        self.record(CallKind::SignUp, &key)?;
        let mut accounts = lock(&self.inner.accounts);
        if accounts.contains_key(&key) {
            return Err(BackendError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let (email, phone) = match &request.identifier {
            SignupIdentifier::Email(email) => (Some(email.to_string()), None),
            SignupIdentifier::Phone(phone) => (None, Some(phone.clone())),
        };
        let confirmed = self.inner.auto_confirm;
        let user = AuthUser {
            id: UserId::new(Uuid::new_v4()),
            email,
            phone,
            user_metadata: UserMetadata {
                display_name: Some(request.display_name.clone()),
                full_name: None,
            },
            app_metadata: AppMetadata {
                role: None,
                provider: Some("email".to_string()),
            },
            email_confirmed_at: confirmed.then(Utc::now),
        };
        accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: request.password.clone(),
                confirmed,
            },
        );
        drop(accounts);

        if confirmed {
            Ok(SignUpOutcome::SignedIn(self.issue_session(user)))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired(user))
        }
    }

    fn oauth_authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        _code_challenge: &str,
    ) -> Result<String, BackendError> {
        let mut url = url::Url::parse(redirect_to)?;
        url.query_pairs_mut()
            .append_pair("code", OAUTH_CODE)
            .append_pair("provider", provider.as_str());
        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        auth_code: &str,
        _code_verifier: &str,
    ) -> Result<AuthSession, BackendError> {
        self.record(CallKind::ExchangeCode, auth_code)?;
        if auth_code != OAUTH_CODE {
            return Err(BackendError::Api {
                status: 400,
                message: "invalid flow state, no valid flow state found".to_string(),
            });
        }
        let known = lock(&self.inner.accounts).get(OAUTH_EMAIL).cloned();
        let user = match known {
            Some(account) => account.user,
            None => {
                self.add_account(OAUTH_EMAIL, &Uuid::new_v4().to_string(), "OAuth User", UserRole::User);
                lock(&self.inner.accounts)
                    .get(OAUTH_EMAIL)
                    .map(|a| a.user.clone())
                    .ok_or(BackendError::NotFound)?
            }
        };
        Ok(self.issue_session(user))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        self.record(CallKind::Refresh, "session")?;
        let key = lock(&self.inner.refresh_tokens)
            .remove(refresh_token)
            .ok_or_else(|| BackendError::Api {
                status: 400,
                message: "Invalid Refresh Token: Refresh Token Not Found".to_string(),
            })?;
        let account = lock(&self.inner.accounts)
            .get(&key)
            .cloned()
            .ok_or(BackendError::NotFound)?;
        Ok(self.issue_session(account.user))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        self.record(CallKind::GetUser, "user")?;
        Ok(self.account_for_token(access_token)?.user)
    }

    async fn update_display_name(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> Result<AuthUser, BackendError> {
        self.record(CallKind::UpdateUser, "user")?;
        let account = self.account_for_token(access_token)?;
        let key = account_key(&account.user);
        let mut accounts = lock(&self.inner.accounts);
        let stored = accounts.get_mut(&key).ok_or_else(invalid_token)?;
        stored.user.user_metadata.display_name = Some(display_name.to_string());
        Ok(stored.user.clone())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.record(CallKind::SignOut, "user")?;
        lock(&self.inner.access_tokens).remove(access_token);
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        _redirect_to: &str,
    ) -> Result<(), BackendError> {
        self.record(CallKind::ResetPassword, email)
    }

    async fn resend_signup(&self, email: &str, _redirect_to: &str) -> Result<(), BackendError> {
        self.record(CallKind::ResendSignup, email)
    }

    async fn send_magic_link(
        &self,
        email: &str,
        _redirect_to: &str,
        _code_challenge: &str,
    ) -> Result<(), BackendError> {
        self.record(CallKind::MagicLink, email)
    }

    async fn subscribe_inserts(&self, table: &str) -> Result<RowStream, BackendError> {
        self.record(CallKind::Subscribe, table)?;
        let table = table.to_string();
        let stream = BroadcastStream::new(self.inner.inserts.subscribe()).filter_map(
            move |event| {
                let row = match event {
                    Ok((source, row)) if source == table => Some(Ok(row)),
                    // Lagged receivers skip missed rows; the feed is best effort.
                    _ => None,
                };
                futures::future::ready(row)
            },
        );
        Ok(stream.boxed())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.record(CallKind::Ping, "health")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_select_filters_orders_and_limits() {
        let backend = MemoryBackend::new();
        backend.seed_row("applications", json!({"name": "A", "user_id": "u1", "created_at": "2024-01-01T00:00:00Z"}));
        backend.seed_row("applications", json!({"name": "B", "user_id": "u2", "created_at": "2024-01-02T00:00:00Z"}));
        backend.seed_row("applications", json!({"name": "C", "user_id": "u1", "created_at": "2024-01-03T00:00:00Z"}));

        let rows = backend
            .select("applications", &RowQuery::newest_first().eq("user_id", "u1"))
            .await
            .unwrap();
        let names: Vec<&str> = rows.iter().filter_map(|r| r["name"].as_str()).collect();
        assert_eq!(names, vec!["C", "A"]);

        let limited = backend
            .select("applications", &RowQuery::newest_first().limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(backend.calls_of(CallKind::Select).len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_id() {
        let backend = MemoryBackend::new();
        let row = backend.seed_row("services", json!({"name": "Old"}));
        let id = row["id"].as_i64().unwrap();

        let updated = backend
            .update("services", id, json!({"name": "New"}))
            .await
            .unwrap();
        assert_eq!(updated["name"], "New");

        backend.delete("services", id).await.unwrap();
        assert!(matches!(
            backend.delete("services", id).await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let backend = MemoryBackend::new();
        backend.fail_next(CallKind::Insert, "insert blocked");
        let err = backend.insert("t", json!({})).await.unwrap_err();
        assert_eq!(err.user_message(), "insert blocked");
        assert!(backend.insert("t", json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_password_sign_in() {
        let backend = MemoryBackend::new();
        backend.add_account("admin@example.com", "hunter22", "Admin", UserRole::Admin);

        let session = backend
            .sign_in_with_password("Admin@Example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(session.user.metadata_role(), UserRole::Admin);

        let user = backend.get_user(&session.access_token).await.unwrap();
        assert_eq!(user.id, session.user.id);

        let err = backend
            .sign_in_with_password("admin@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let backend = MemoryBackend::new();
        backend.add_account("pat@example.com", "secret1", "Pat", UserRole::User);
        let session = backend
            .sign_in_with_password("pat@example.com", "secret1")
            .await
            .unwrap();
        let refreshed = backend.refresh_session(&session.refresh_token).await.unwrap();
        assert_ne!(refreshed.access_token, session.access_token);
        assert!(backend.refresh_session(&session.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_subscribe_receives_only_its_table() {
        let backend = MemoryBackend::new();
        let mut stream = backend.subscribe_inserts("user_messages").await.unwrap();
        backend.seed_row("services", json!({"name": "ignored"}));
        backend.seed_row("user_messages", json!({"name": "Jane"}));

        let row = stream.next().await.unwrap().unwrap();
        assert_eq!(row["name"], "Jane");
    }
}
