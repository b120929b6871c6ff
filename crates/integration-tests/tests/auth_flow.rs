//! Sign-in, sign-up, sign-out and the guards on protected routes.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use jack_machine_integration_tests::{
    PASSWORD, TestApp, USER_EMAIL, body_text, location, redirects_to, session_cookie,
};
use jack_machine_portal::backend::MemoryBackend;
use jack_machine_portal::backend::memory::CallKind;

#[tokio::test]
async fn test_user_login_lands_on_dashboard() {
    let app = TestApp::new();
    let cookie = app.user_cookie().await;

    let response = app.get("/users/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Jane Doe"));
}

#[tokio::test]
async fn test_wrong_password_shows_provider_message() {
    let app = TestApp::new();
    app.backend.add_account(
        USER_EMAIL,
        PASSWORD,
        "Jane Doe",
        jack_machine_core::UserRole::User,
    );

    let response = app
        .post_form(
            "/login",
            &format!("email={USER_EMAIL}&password=nope"),
            None,
            false,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Invalid login credentials"));
}

#[tokio::test]
async fn test_login_honours_safe_next_only() {
    let app = TestApp::new();
    app.backend.add_account(
        USER_EMAIL,
        PASSWORD,
        "Jane Doe",
        jack_machine_core::UserRole::User,
    );

    let response = app
        .post_form(
            "/login",
            &format!("email={USER_EMAIL}&password={PASSWORD}&next=%2Fusers%2Fjobs"),
            None,
            false,
        )
        .await;
    assert_eq!(location(&response), Some("/users/jobs"));

    let response = app
        .post_form(
            "/login",
            &format!("email={USER_EMAIL}&password={PASSWORD}&next=https%3A%2F%2Fevil.example"),
            None,
            false,
        )
        .await;
    assert_eq!(location(&response), Some("/users/dashboard"));
}

#[tokio::test]
async fn test_unauthenticated_user_routes_redirect_to_login() {
    let app = TestApp::new();
    for (path, login) in [
        ("/users/dashboard", "/login?next=%2Fusers%2Fdashboard"),
        ("/users/result", "/login?next=%2Fusers%2Fresult"),
        ("/users/profile", "/login?next=%2Fusers%2Fprofile"),
    ] {
        let response = app.get(path, None).await;
        assert!(redirects_to(&response, login), "{path}");
    }

    let response = app.post_form("/users/profile", "display_name=Jo", None, false).await;
    assert!(redirects_to(&response, "/login"));
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_deep_link_returns_after_login() {
    let app = TestApp::new();
    app.backend.add_account(
        USER_EMAIL,
        PASSWORD,
        "Jane Doe",
        jack_machine_core::UserRole::User,
    );

    let response = app.get("/users/result", None).await;
    let login = location(&response).unwrap().to_string();
    assert_eq!(login, "/login?next=%2Fusers%2Fresult");

    let page = body_text(app.get(&login, None).await).await;
    assert!(page.contains(r#"name="next""#));
    assert!(page.contains("users/result"));

    let response = app
        .post_form(
            "/login",
            &format!("email={USER_EMAIL}&password={PASSWORD}&next=%2Fusers%2Fresult"),
            None,
            false,
        )
        .await;
    assert!(redirects_to(&response, "/users/result"));
}

#[tokio::test]
async fn test_verify_email_page_renders_without_session() {
    let app = TestApp::new();

    let response = app.get("/users/verify-email?email=a@b.co", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Check your inbox"));
    assert!(body.contains("a@b.co"));

    let response = app.post_form("/users/verify-email", "email=", None, false).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Email address is missing."));
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_admin_routes_redirect_without_fetching() {
    let app = TestApp::new();
    for path in [
        "/admin",
        "/admin/dashboard",
        "/admin/dashboard/events",
        "/admin/services",
        "/admin/careers",
        "/admin/applications",
        "/admin/messages",
    ] {
        let response = app.get(path, None).await;
        assert!(redirects_to(&response, "/admin/login"), "{path}");
    }

    let response = app
        .post_form("/admin/services/1/delete", "", None, false)
        .await;
    assert!(redirects_to(&response, "/admin/login"));

    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_regular_user_is_refused_by_admin_console() {
    let app = TestApp::new();
    let cookie = app.user_cookie().await;

    let response = app.get("/admin/applications", Some(&cookie)).await;
    assert!(redirects_to(&response, "/admin/login?error=forbidden"));
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_admin_login_rejects_regular_account() {
    let app = TestApp::new();
    app.backend.add_account(
        USER_EMAIL,
        PASSWORD,
        "Jane Doe",
        jack_machine_core::UserRole::User,
    );

    let response = app
        .post_form(
            "/admin/login",
            &format!("email={USER_EMAIL}&password={PASSWORD}"),
            None,
            false,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("does not have admin access"));
}

#[tokio::test]
async fn test_signup_signs_in_when_auto_confirmed() {
    let app = TestApp::new();
    let response = app
        .post_form(
            "/signup",
            "display_name=Sam+Hill&identifier=sam%40example.com&password=secret123",
            None,
            false,
        )
        .await;

    assert!(redirects_to(&response, "/users/dashboard"));
    let cookie = session_cookie(response.headers());
    let response = app.get("/users/profile", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_pending_confirmation_goes_to_verify_page() {
    let app = TestApp::with_backend(MemoryBackend::with_auto_confirm(false));
    let response = app
        .post_form(
            "/signup",
            "display_name=Sam+Hill&identifier=sam%40example.com&password=secret123",
            None,
            false,
        )
        .await;

    assert!(redirects_to(
        &response,
        "/users/verify-email?email=sam%40example.com"
    ));
}

#[tokio::test]
async fn test_invalid_signup_never_reaches_provider() {
    let app = TestApp::new();
    let response = app
        .post_form(
            "/signup",
            "display_name=Sam&identifier=sam%40example.com&password=123",
            None,
            false,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("at least 6 characters"));
    assert!(app.backend.calls_of(CallKind::SignUp).is_empty());
}

#[tokio::test]
async fn test_oauth_round_trip_exchanges_code() {
    let app = TestApp::new();

    let start = app.get("/auth/oauth/google", None).await;
    assert_eq!(start.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(start.headers());
    let target = location(&start).unwrap().to_string();
    let callback = target.strip_prefix("http://localhost:3000").unwrap();
    assert!(callback.starts_with("/auth/callback?code="));

    let response = app.get(callback, Some(&cookie)).await;
    assert!(redirects_to(&response, "/users/dashboard"));
    assert_eq!(app.backend.calls_of(CallKind::ExchangeCode).len(), 1);
}

#[tokio::test]
async fn test_callback_without_verifier_asks_to_retry() {
    let app = TestApp::new();
    let response = app.get("/auth/callback?code=anything", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).unwrap().starts_with("/login?error="));
    assert!(app.backend.calls_of(CallKind::ExchangeCode).is_empty());
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new();
    let cookie = app.user_cookie().await;

    let response = app.post_form("/logout", "", Some(&cookie), false).await;
    assert!(redirects_to(&response, "/"));
    assert_eq!(app.backend.calls_of(CallKind::SignOut).len(), 1);

    let response = app.get("/users/dashboard", Some(&cookie)).await;
    assert!(redirects_to(&response, "/login?next=%2Fusers%2Fdashboard"));
}
