//! Integration tests for the Jack Machine portal.
//!
//! Every test drives the real router, with its full middleware stack, against
//! the in-process data service. The backend records each call it receives,
//! so tests assert on what reached the data service as well as on responses.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p jack-machine-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `public_site` - Marketing pages, contact form, job applications
//! - `auth_flow` - Sign-in, sign-up and route guards
//! - `admin_console` - Admin CRUD, partial responses, dashboard feed

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
    response::Response,
};
use tower::ServiceExt;

use jack_machine_core::UserRole;
use jack_machine_portal::backend::MemoryBackend;
use jack_machine_portal::config::{BackendKind, PortalConfig};
use jack_machine_portal::state::AppState;

/// Password given to every account the harness creates.
pub const PASSWORD: &str = "correct-horse";

/// Admin account created by [`TestApp::admin_cookie`].
pub const ADMIN_EMAIL: &str = "admin@jackmachine.example";

/// Regular account created by [`TestApp::user_cookie`].
pub const USER_EMAIL: &str = "jane@example.com";

/// Configuration for a portal backed by [`MemoryBackend`].
#[must_use]
pub fn test_config() -> PortalConfig {
    PortalConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        backend: BackendKind::Memory,
        supabase: None,
        admin_emails: HashSet::new(),
        static_dir: "../portal/static".to_string(),
        catalog_ttl: Duration::from_secs(300),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The portal router plus handles on its backend and state.
pub struct TestApp {
    pub backend: MemoryBackend,
    pub state: AppState,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    /// Build the app around an existing backend.
    #[must_use]
    pub fn with_backend(backend: MemoryBackend) -> Self {
        let state = AppState::new(test_config(), Arc::new(backend.clone()));
        let router = jack_machine_portal::app(state.clone());
        Self {
            backend,
            state,
            router,
        }
    }

    /// Send one request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the router itself fails, which it never does for HTTP errors.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// `GET path`, optionally with a session cookie.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("valid request"))
            .await
    }

    /// `POST path` with a url-encoded form body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn post_form(
        &self,
        path: &str,
        form: &str,
        cookie: Option<&str>,
        partial: bool,
    ) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if partial {
            builder = builder.header("X-Partial", "true");
        }
        self.send(builder.body(Body::from(form.to_string())).expect("valid request"))
            .await
    }

    /// Sign in as a fresh admin through the admin login form.
    ///
    /// Recorded backend calls are cleared afterwards.
    pub async fn admin_cookie(&self) -> String {
        self.backend
            .add_account(ADMIN_EMAIL, PASSWORD, "Dana Admin", UserRole::Admin);
        let response = self
            .post_form(
                "/admin/login",
                &format!("email={ADMIN_EMAIL}&password={PASSWORD}"),
                None,
                false,
            )
            .await;
        assert_eq!(location(&response), Some("/admin/dashboard"));
        let cookie = session_cookie(response.headers());
        self.backend.clear_calls();
        cookie
    }

    /// Sign in as a fresh regular user through the login form.
    ///
    /// Recorded backend calls are cleared afterwards.
    pub async fn user_cookie(&self) -> String {
        self.backend
            .add_account(USER_EMAIL, PASSWORD, "Jane Doe", UserRole::User);
        let response = self
            .post_form(
                "/login",
                &format!("email={USER_EMAIL}&password={PASSWORD}"),
                None,
                false,
            )
            .await;
        assert_eq!(location(&response), Some("/users/dashboard"));
        let cookie = session_cookie(response.headers());
        self.backend.clear_calls();
        cookie
    }
}

/// `name=value` of the session cookie set by a response.
///
/// # Panics
///
/// Panics if the response set no cookie.
#[must_use]
pub fn session_cookie(headers: &HeaderMap) -> String {
    headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
        .expect("response sets a session cookie")
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// Whether the response is a redirect to `path`.
#[must_use]
pub fn redirects_to(response: &Response, path: &str) -> bool {
    response.status() == StatusCode::SEE_OTHER && location(response) == Some(path)
}

/// Collect a response body as text.
///
/// # Panics
///
/// Panics if the body cannot be read or is not UTF-8.
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
