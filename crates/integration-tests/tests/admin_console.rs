//! Admin console: catalog editing, application review, the inbox and the
//! live dashboard feed.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::{StatusCode, header};
use futures::StreamExt;
use serde_json::json;

use jack_machine_integration_tests::{TestApp, body_text, location, redirects_to};
use jack_machine_portal::backend::DataService;
use jack_machine_portal::backend::memory::CallKind;

fn seed_application(app: &TestApp, name: &str, email: &str, status: &str) -> i64 {
    let row = app.backend.seed_row(
        "applications",
        json!({
            "name": name,
            "email": email,
            "position": "Field Technician",
            "location": "Rochester, NY",
            "status": status
        }),
    );
    row["id"].as_i64().unwrap()
}

fn kinds(app: &TestApp) -> Vec<CallKind> {
    app.backend.calls().iter().map(|c| c.kind).collect()
}

// ============================================================================
// Dashboard
// ============================================================================

#[tokio::test]
async fn test_dashboard_shows_counts() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    seed_application(&app, "Jane Doe", "jane@example.com", "pending");
    seed_application(&app, "Bob Smith", "bob@example.com", "approved");
    app.backend.seed_row(
        "user_messages",
        json!({"name": "Sam", "email": "sam@example.com", "message": "Hi", "is_read": false}),
    );

    let response = app.get("/admin/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("data-unread=\"1\""));
    assert!(body.contains("data-events=\"/admin/dashboard/events\""));
}

#[tokio::test]
async fn test_dashboard_feed_pushes_toast_and_counter_without_refetch() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let upstream = app.state.start_notifications();

    for _ in 0..200 {
        if app.backend.subscriber_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(app.backend.subscriber_count(), 1);

    let response = app
        .get("/admin/dashboard/events?unread=3", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    app.backend.clear_calls();
    app.backend.seed_row(
        "user_messages",
        json!({
            "name": "Sam",
            "email": "sam@example.com",
            "subject": "Pump quote",
            "message": "Need a quote for a hydraulic pump.",
            "is_read": false
        }),
    );

    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let event = String::from_utf8(chunk.to_vec()).unwrap();

    assert!(event.contains("event: message"));
    assert!(event.contains("\"unread\":4"));
    assert!(event.contains("New message from Sam: Pump quote"));
    assert!(app.backend.calls_of(CallKind::Select).is_empty());
    assert!(app.backend.calls_of(CallKind::Count).is_empty());

    upstream.abort();
}

#[tokio::test]
async fn test_dashboard_feed_counts_message_between_render_and_connect() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let upstream = app.state.start_notifications();
    while app.backend.subscriber_count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let page = body_text(app.get("/admin/dashboard", Some(&cookie)).await).await;
    assert!(page.contains("data-unread=\"0\""));
    assert!(page.contains("data-since=\"0\""));

    app.backend.seed_row(
        "user_messages",
        json!({"name": "Sam", "email": "sam@example.com", "message": "Hi", "is_read": false}),
    );
    for _ in 0..200 {
        if app.state.notifications().sequence() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(app.state.notifications().sequence(), 1);

    app.backend.clear_calls();
    let response = app
        .get("/admin/dashboard/events?unread=0&since=0", Some(&cookie))
        .await;
    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let event = String::from_utf8(chunk.to_vec()).unwrap();

    assert!(event.contains("\"unread\":1"));
    assert!(!event.contains("toast"));
    assert!(app.backend.calls_of(CallKind::Count).is_empty());

    upstream.abort();
}

// ============================================================================
// Applications
// ============================================================================

#[tokio::test]
async fn test_search_then_shortlist_returns_only_the_row() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let jane = seed_application(&app, "Jane Doe", "jane@example.com", "pending");
    seed_application(&app, "Janet Reyes", "j.reyes@example.com", "Shortlisted");
    seed_application(&app, "Bob Smith", "bob@example.com", "rejected");

    let body = body_text(app.get("/admin/applications?q=JANE", Some(&cookie)).await).await;
    assert!(body.contains("Jane Doe"));
    assert!(body.contains("Janet Reyes"));
    assert!(!body.contains("Bob Smith"));

    app.backend.clear_calls();
    let response = app
        .post_form(
            &format!("/admin/applications/{jane}/status"),
            "status=shortlisted",
            Some(&cookie),
            true,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let fragment = body_text(response).await;
    assert!(fragment.trim_start().starts_with("<tr"));
    assert!(!fragment.contains("<html"));
    assert!(fragment.contains("Jane Doe"));
    assert!(fragment.contains("Shortlisted"));
    assert!(!fragment.contains("Janet Reyes"));

    assert_eq!(kinds(&app), vec![CallKind::Update]);
    let rows = app.backend.rows("applications");
    let stored = rows.iter().find(|r| r["id"] == jane).unwrap();
    assert_eq!(stored["status"], "shortlisted");
}

#[tokio::test]
async fn test_status_change_without_partial_redirects_with_notice() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let jane = seed_application(&app, "Jane Doe", "jane@example.com", "pending");

    let response = app
        .post_form(
            &format!("/admin/applications/{jane}/status"),
            "status=approved",
            Some(&cookie),
            false,
        )
        .await;

    assert!(redirects_to(
        &response,
        "/admin/applications?notice=Jane%20Doe%20marked%20Approved."
    ));
}

#[tokio::test]
async fn test_unknown_status_is_rejected_before_update() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let jane = seed_application(&app, "Jane Doe", "jane@example.com", "pending");
    app.backend.clear_calls();

    let response = app
        .post_form(
            &format!("/admin/applications/{jane}/status"),
            "status=hired",
            Some(&cookie),
            true,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_status_filter() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    seed_application(&app, "Jane Doe", "jane@example.com", "shortlisted");
    seed_application(&app, "Janet Reyes", "janet@example.com", "Shortlisted");
    seed_application(&app, "Bob Smith", "bob@example.com", "rejected");

    let body = body_text(
        app.get("/admin/applications?status=shortlisted", Some(&cookie))
            .await,
    )
    .await;
    assert!(body.contains("Jane Doe"));
    assert!(body.contains("Janet Reyes"));
    assert!(!body.contains("Bob Smith"));
}

#[tokio::test]
async fn test_dashboard_pending_count_ignores_status_case() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    seed_application(&app, "Jane Doe", "jane@example.com", "pending");
    seed_application(&app, "Janet Reyes", "janet@example.com", "Pending");
    seed_application(&app, "Bob Smith", "bob@example.com", "rejected");

    let body = body_text(app.get("/admin/dashboard", Some(&cookie)).await).await;
    assert!(body.contains(r#"data-pending="2""#));
}

#[tokio::test]
async fn test_resume_download_redirects_to_signed_url() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let key = "resumes/1718000000000_cv.pdf";
    app.backend
        .upload("resumes", key, b"%PDF".to_vec(), "application/pdf")
        .await
        .unwrap();
    let row = app.backend.seed_row(
        "applications",
        json!({"name": "Jane Doe", "email": "jane@example.com", "resume_url": key}),
    );
    let id = row["id"].as_i64().unwrap();
    app.backend.clear_calls();

    let response = app
        .get(&format!("/admin/applications/{id}/resume"), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        Some("memory://resumes/resumes/1718000000000_cv.pdf?expires_in=3600")
    );
    assert_eq!(app.backend.calls_of(CallKind::SignedUrl).len(), 1);
}

#[tokio::test]
async fn test_resume_download_without_resume() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let id = seed_application(&app, "Jane Doe", "jane@example.com", "pending");

    let response = app
        .get(&format!("/admin/applications/{id}/resume"), Some(&cookie))
        .await;

    assert!(location(&response).unwrap().starts_with("/admin/applications?error="));
    assert!(app.backend.calls_of(CallKind::SignedUrl).is_empty());
}

// ============================================================================
// Services and careers
// ============================================================================

#[tokio::test]
async fn test_create_service_invalidates_public_catalog() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let before = body_text(app.get("/services", None).await).await;
    assert!(!before.contains("Crane Inspection"));

    let response = app
        .post_form(
            "/admin/services",
            "name=Crane+Inspection&category=Compliance&description=&clients=12&image_url=&icon=crane",
            Some(&cookie),
            false,
        )
        .await;
    assert!(redirects_to(
        &response,
        "/admin/services?notice=Service%20created."
    ));

    let after = body_text(app.get("/services", None).await).await;
    assert!(after.contains("Crane Inspection"));
}

#[tokio::test]
async fn test_invalid_service_rerenders_form_without_insert() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let response = app
        .post_form(
            "/admin/services",
            "name=Paint&clients=many&icon=wrench",
            Some(&cookie),
            false,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Clients must be a whole number"));
    assert!(app.backend.calls_of(CallKind::Insert).is_empty());
}

#[tokio::test]
async fn test_partial_delete_returns_empty_body() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let row = app
        .backend
        .seed_row("services", json!({"name": "Hydraulic Repair"}));
    let id = row["id"].as_i64().unwrap();

    let response = app
        .post_form(&format!("/admin/services/{id}/delete"), "", Some(&cookie), true)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.is_empty());
    assert!(app.backend.rows("services").is_empty());
}

#[tokio::test]
async fn test_partial_update_of_missing_row_is_not_found() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let response = app
        .post_form(
            "/admin/careers/404",
            "title=Welder&type=Full-time",
            Some(&cookie),
            true,
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_text(response).await,
        "The requested record no longer exists."
    );
}

#[tokio::test]
async fn test_create_job_splits_skills() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let response = app
        .post_form(
            "/admin/careers",
            "title=Shop+Mechanic&department=Shop&location=Remote&type=Part-time&salary=&description=&skills=Welding%2C+Electrical%2C%2C",
            Some(&cookie),
            false,
        )
        .await;

    assert!(redirects_to(
        &response,
        "/admin/careers?notice=Job%20listing%20created."
    ));
    let rows = app.backend.rows("job_listings");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], "Part-time");
    assert_eq!(rows[0]["skills"], json!(["Welding", "Electrical"]));
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_mark_read_returns_updated_row() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let row = app.backend.seed_row(
        "user_messages",
        json!({"name": "Sam", "email": "sam@example.com", "message": "Hi", "is_read": false}),
    );
    let id = row["id"].as_i64().unwrap();
    app.backend.clear_calls();

    let response = app
        .post_form(&format!("/admin/messages/{id}/read"), "", Some(&cookie), true)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let fragment = body_text(response).await;
    assert!(fragment.contains("Sam"));
    assert_eq!(kinds(&app), vec![CallKind::Update]);
    assert_eq!(app.backend.rows("user_messages")[0]["is_read"], true);
}

#[tokio::test]
async fn test_message_search() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    app.backend.seed_row(
        "user_messages",
        json!({"name": "Sam Hill", "email": "sam@example.com", "subject": "Pump quote", "message": "Hi", "is_read": false}),
    );
    app.backend.seed_row(
        "user_messages",
        json!({"name": "Ann Lee", "email": "ann@example.com", "subject": "Invoice", "message": "Hi", "is_read": true}),
    );

    let body = body_text(app.get("/admin/messages?q=pump", Some(&cookie)).await).await;
    assert!(body.contains("Sam Hill"));
    assert!(!body.contains("Ann Lee"));
}
