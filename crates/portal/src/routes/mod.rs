//! HTTP route handlers for the portal.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (pings the data service)
//!
//! # Public site
//! GET  /                              - Home page
//! GET  /services                      - Services grouped by category
//! GET  /careers                       - Open positions (?applied=1 banner)
//! GET  /contact                       - Contact form
//! POST /contact                       - Store a contact message
//! GET  /application/{id}              - Job summary and application form
//! POST /application/{id}              - Submit an application (multipart)
//!
//! # Auth
//! GET  /login                         - Login page
//! POST /login                         - Password sign-in
//! POST /login/reset                   - Send a password reset e-mail
//! POST /login/magic-link              - Send a one-time sign-in link
//! GET  /signup                        - Sign-up page
//! POST /signup                        - Create an account
//! GET  /auth/oauth/{provider}         - Start an OAuth (PKCE) sign-in
//! GET  /auth/callback                 - Exchange the provider code
//! POST /logout                        - Sign out
//!
//! # User portal (requires sign-in)
//! GET  /users/dashboard               - Application counts and latest jobs
//! GET  /users/jobs                    - All job listings
//! GET  /users/result                  - My applications
//! GET  /users/profile                 - Profile
//! POST /users/profile                 - Update display name
//! GET  /users/contact                 - Prefilled contact form
//! POST /users/contact                 - Store a contact message
//! GET  /users/verify-email            - Confirmation pending page
//! POST /users/verify-email            - Resend the confirmation e-mail
//!
//! # Admin console (requires the admin role)
//! see [`admin`]
//! ```

pub mod admin;
pub mod application;
pub mod auth;
pub mod contact;
pub mod errors;
pub mod health;
pub mod pages;
pub mod users;
pub mod views;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Multipart bodies carry the resume plus the text fields.
const APPLICATION_BODY_LIMIT: usize = 6 * 1024 * 1024;

/// Create the public page routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/services", get(pages::services))
        .route("/careers", get(pages::careers))
        .route("/contact", get(contact::contact_page).post(contact::submit))
        .route(
            "/application/{id}",
            get(application::show)
                .post(application::submit)
                .layer(DefaultBodyLimit::max(APPLICATION_BODY_LIMIT)),
        )
}

/// Create the auth routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/login/reset", post(auth::reset_password))
        .route("/login/magic-link", post(auth::magic_link))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/auth/oauth/{provider}", get(auth::oauth_start))
        .route("/auth/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
}

/// Create the user portal routes, nested under `/users`.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(users::dashboard))
        .route("/jobs", get(users::jobs))
        .route("/result", get(users::result))
        .route(
            "/profile",
            get(users::profile_page).post(users::update_profile),
        )
        .route(
            "/contact",
            get(users::contact_page).post(users::submit_contact_form),
        )
        .route(
            "/verify-email",
            get(users::verify_email_page).post(users::resend_verification),
        )
}

/// Create all routes for the portal.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Public site
        .merge(public_routes())
        // Auth
        .merge(auth_routes())
        // User portal
        .nest("/users", user_routes())
        // Admin console
        .nest("/admin", admin::routes())
        .fallback(errors::fallback)
}
