//! Signed-in user portal.
//!
//! Every page except `/users/verify-email` requires a session; the
//! [`RequireUser`] extractor redirects anonymous visitors to `/login`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jack_machine_core::validation::{self, ValidationError};
use jack_machine_core::{Application, ApplicationStatus, ContactForm};

use crate::db::ApplicationRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalUser, RequireUser, set_auth_context};
use crate::models::{AuthContext, SessionUser};
use crate::routes::contact::submit_contact;
use crate::routes::views::{ApplicationRow, JobCard};
use crate::services::auth::session_user;
use crate::state::AppState;

/// Jobs shown on the user dashboard.
const DASHBOARD_JOBS: usize = 3;

/// Longest display name accepted by the profile form.
const MAX_DISPLAY_NAME: usize = 80;

// =============================================================================
// View types
// =============================================================================

/// Number of the user's applications in one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub label: &'static str,
    pub badge: &'static str,
    pub count: usize,
}

/// An application on the results page with its applicant-facing note.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub row: ApplicationRow,
    pub label: &'static str,
    pub note: Option<&'static str>,
}

fn status_note(status: ApplicationStatus) -> Option<&'static str> {
    match status {
        ApplicationStatus::Shortlisted => Some(
            "Next steps: our hiring team will contact you within a few business days to schedule an interview.",
        ),
        ApplicationStatus::Rejected => Some(
            "Thank you for your interest. We have decided to move forward with other candidates for this role, but we encourage you to apply for future openings.",
        ),
        ApplicationStatus::Pending | ApplicationStatus::Approved => None,
    }
}

fn status_counts(applications: &[Application]) -> Vec<StatusCount> {
    ApplicationStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            label: status.applicant_label(),
            badge: status.badge_class(),
            count: applications.iter().filter(|a| a.status == status).count(),
        })
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "users/dashboard.html")]
pub struct DashboardTemplate {
    pub user: SessionUser,
    pub current_path: &'static str,
    pub total: usize,
    pub counts: Vec<StatusCount>,
    pub jobs: Vec<JobCard>,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/jobs.html")]
pub struct JobsTemplate {
    pub user: SessionUser,
    pub current_path: &'static str,
    pub jobs: Vec<JobCard>,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/result.html")]
pub struct ResultTemplate {
    pub user: SessionUser,
    pub current_path: &'static str,
    pub rows: Vec<ResultRow>,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/profile.html")]
pub struct ProfileTemplate {
    pub user: SessionUser,
    pub current_path: &'static str,
    pub display_name: String,
    pub saved: bool,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/contact.html")]
pub struct UserContactTemplate {
    pub user: SessionUser,
    pub current_path: &'static str,
    pub form: ContactForm,
    pub sent: bool,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/verify_email.html")]
pub struct VerifyEmailTemplate {
    pub viewer: Option<SessionUser>,
    pub email: String,
    pub notice: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Query / form types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct FlagQuery {
    pub saved: Option<String>,
    pub sent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyEmailQuery {
    #[serde(default)]
    pub email: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Greeting, application counts per status and the latest jobs.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
) -> impl IntoResponse {
    let applications = ApplicationRepository::new(state.data());
    let (mine, jobs) = tokio::join!(
        applications.list_for_user(auth.user.id),
        state.catalog().jobs(state.data()),
    );

    let mut error = None;
    let mine = mine.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load applications");
        error = Some(e.user_message());
        Vec::new()
    });
    let jobs = match jobs {
        Ok(jobs) => jobs.iter().take(DASHBOARD_JOBS).map(JobCard::from).collect(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load job listings");
            error = Some(e.user_message());
            Vec::new()
        }
    };

    DashboardTemplate {
        user: auth.user,
        current_path: "/users/dashboard",
        total: mine.len(),
        counts: status_counts(&mine),
        jobs,
        error,
    }
}

/// All job listings with apply links.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn jobs(State(state): State<AppState>, RequireUser(auth): RequireUser) -> impl IntoResponse {
    let (jobs, error) = match state.catalog().jobs(state.data()).await {
        Ok(jobs) => (jobs.iter().map(JobCard::from).collect(), None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load job listings");
            (Vec::new(), Some(e.user_message()))
        }
    };
    JobsTemplate {
        user: auth.user,
        current_path: "/users/jobs",
        jobs,
        error,
    }
}

/// The signed-in user's applications, newest first.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn result(State(state): State<AppState>, RequireUser(auth): RequireUser) -> impl IntoResponse {
    let (rows, error) = match ApplicationRepository::new(state.data())
        .list_for_user(auth.user.id)
        .await
    {
        Ok(applications) => (
            applications
                .iter()
                .map(|application| ResultRow {
                    row: ApplicationRow::from(application),
                    label: application.status.applicant_label(),
                    note: status_note(application.status),
                })
                .collect(),
            None,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load applications");
            (Vec::new(), Some(e.user_message()))
        }
    };
    ResultTemplate {
        user: auth.user,
        current_path: "/users/result",
        rows,
        error,
    }
}

/// Display the profile page.
pub async fn profile_page(
    RequireUser(auth): RequireUser,
    Query(query): Query<FlagQuery>,
) -> impl IntoResponse {
    ProfileTemplate {
        display_name: auth.user.username.clone(),
        user: auth.user,
        current_path: "/users/profile",
        saved: query.saved.is_some(),
        error: None,
    }
}

fn validate_display_name(raw: &str) -> std::result::Result<String, ValidationError> {
    let name = validation::required("Display name", raw)?;
    validation::max_len("Display name", &name, MAX_DISPLAY_NAME)?;
    Ok(name)
}

/// Update the display name at the provider and in the session.
#[instrument(skip(state, session, auth, form), fields(user_id = %auth.user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireUser(auth): RequireUser,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let rerender = |auth: AuthContext, display_name: String, error: String| {
        ProfileTemplate {
            user: auth.user,
            current_path: "/users/profile",
            display_name,
            saved: false,
            error: Some(error),
        }
        .into_response()
    };

    let name = match validate_display_name(&form.display_name) {
        Ok(name) => name,
        Err(e) => return Ok(rerender(auth, form.display_name, e.to_string())),
    };

    match state
        .data()
        .update_display_name(&auth.access_token, &name)
        .await
    {
        Ok(updated) => {
            let context = AuthContext {
                user: session_user(&updated, &state.config().admin_emails),
                ..auth
            };
            set_auth_context(&session, &context).await?;
            tracing::info!("Display name updated");
            Ok(Redirect::to("/users/profile?saved=1").into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Display name update failed");
            Ok(rerender(auth, name, e.user_message()))
        }
    }
}

/// Contact form prefilled from the session.
pub async fn contact_page(
    RequireUser(auth): RequireUser,
    Query(query): Query<FlagQuery>,
) -> impl IntoResponse {
    let form = ContactForm {
        name: auth.user.username.clone(),
        email: auth.user.email.clone(),
        ..ContactForm::default()
    };
    UserContactTemplate {
        user: auth.user,
        current_path: "/users/contact",
        form,
        sent: query.sent.is_some(),
        error: None,
    }
}

/// Handle the portal contact form.
#[instrument(skip(state, auth, form), fields(user_id = %auth.user.id))]
pub async fn submit_contact_form(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
    Form(form): Form<ContactForm>,
) -> Response {
    match submit_contact(state.data(), &form).await {
        Ok(_) => Redirect::to("/users/contact?sent=1").into_response(),
        Err(error) => UserContactTemplate {
            user: auth.user,
            current_path: "/users/contact",
            form,
            sent: false,
            error: Some(error),
        }
        .into_response(),
    }
}

/// "Check your inbox" page shown after a sign-up that needs confirmation.
pub async fn verify_email_page(
    OptionalUser(viewer): OptionalUser,
    Query(query): Query<VerifyEmailQuery>,
) -> impl IntoResponse {
    VerifyEmailTemplate {
        viewer: viewer.map(|auth| auth.user),
        email: query.email.trim().to_string(),
        notice: None,
        error: None,
    }
}

/// Resend the sign-up confirmation e-mail.
#[instrument(skip(state, viewer, form))]
pub async fn resend_verification(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Form(form): Form<VerifyEmailQuery>,
) -> impl IntoResponse {
    let email = form.email.trim().to_string();
    let viewer = viewer.map(|auth| auth.user);
    if email.is_empty() {
        return VerifyEmailTemplate {
            viewer,
            email,
            notice: None,
            error: Some("Email address is missing.".to_string()),
        };
    }

    let redirect_to = state.config().absolute_url("/login");
    match state.data().resend_signup(&email, &redirect_to).await {
        Ok(()) => VerifyEmailTemplate {
            viewer,
            email,
            notice: Some("Verification email sent again. Please check your inbox.".to_string()),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Resend confirmation failed");
            VerifyEmailTemplate {
                viewer,
                email,
                notice: None,
                error: Some(e.user_message()),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use jack_machine_core::ApplicationId;

    use super::*;

    fn application(status: ApplicationStatus) -> Application {
        Application {
            id: ApplicationId::new(1),
            user_id: None,
            job_id: None,
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            position: "Welder".to_string(),
            job_type: None,
            location: None,
            salary: None,
            resume_url: None,
            cover_letter: None,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_counts_cover_every_status() {
        let apps = vec![
            application(ApplicationStatus::Pending),
            application(ApplicationStatus::Pending),
            application(ApplicationStatus::Rejected),
        ];
        let counts = status_counts(&apps);
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[0].label, "Under Review");
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].count, 0);
        assert_eq!(counts[2].count, 1);
    }

    #[test]
    fn test_status_notes() {
        assert!(status_note(ApplicationStatus::Shortlisted).is_some_and(|n| n.starts_with("Next steps")));
        assert!(status_note(ApplicationStatus::Rejected).is_some());
        assert!(status_note(ApplicationStatus::Pending).is_none());
    }

    #[test]
    fn test_display_name_validation() {
        assert_eq!(validate_display_name("  Pat  ").unwrap(), "Pat");
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(&"x".repeat(81)).is_err());
    }
}
