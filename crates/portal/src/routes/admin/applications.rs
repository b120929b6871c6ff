//! Admin application review.
//!
//! Staff search by applicant name or e-mail, narrow by status, move an
//! application through review, and download the resume through a fresh
//! signed URL.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use jack_machine_core::{ApplicationId, ApplicationStatus, filter_by_query};

use super::{mutation_failed, redirect_with_error, redirect_with_notice, wants_partial};
use crate::db::ApplicationRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::SessionUser;
use crate::routes::views::ApplicationRow;
use crate::state::AppState;

const LIST_PATH: &str = "/admin/applications";

/// Statuses offered in the filter and the row action menu.
const STATUSES: &[ApplicationStatus] = &ApplicationStatus::ALL;

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationsQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/applications.html")]
pub struct ApplicationsTemplate {
    pub admin: SessionUser,
    pub current_path: &'static str,
    pub q: String,
    /// Selected status filter, empty for all.
    pub status: String,
    pub statuses: &'static [ApplicationStatus],
    pub rows: Vec<ApplicationRow>,
    pub total: usize,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/_application_row.html")]
pub struct ApplicationRowTemplate {
    pub row: ApplicationRow,
    pub statuses: &'static [ApplicationStatus],
}

/// List applications, filtered by name or e-mail and optionally by status.
#[instrument(skip(state, auth, query), fields(user_id = %auth.user.id, q = ?query.q, status = ?query.status))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<ApplicationsQuery>,
) -> impl IntoResponse {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<ApplicationStatus>().ok());

    let (rows, total, error) = match ApplicationRepository::new(state.data()).list(status).await {
        Ok(all) => (
            filter_by_query(&all, query.q.as_deref())
                .iter()
                .map(ApplicationRow::from)
                .collect(),
            all.len(),
            query.error,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load applications");
            (Vec::new(), 0, Some(e.user_message()))
        }
    };

    ApplicationsTemplate {
        admin: auth.user,
        current_path: LIST_PATH,
        q: query.q.unwrap_or_default(),
        status: status.map(|s| s.as_str().to_string()).unwrap_or_default(),
        statuses: STATUSES,
        rows,
        total,
        error,
        notice: query.notice,
    }
}

/// Move an application to a new review status.
///
/// A partial request gets back only the updated row, rendered from the row
/// the data service returned; the list is not re-fetched.
#[instrument(skip(state, auth, headers, form), fields(user_id = %auth.user.id, status = %form.status))]
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<StatusForm>,
) -> Response {
    let Ok(status) = form.status.parse::<ApplicationStatus>() else {
        let message = format!("Unknown status \"{}\".", form.status);
        return if wants_partial(&headers) {
            (StatusCode::BAD_REQUEST, message).into_response()
        } else {
            redirect_with_error(LIST_PATH, &message)
        };
    };

    match ApplicationRepository::new(state.data())
        .set_status(ApplicationId::new(id), status)
        .await
    {
        Ok(application) => {
            tracing::info!(application_id = id, status = %application.status, "Application status changed");
            if wants_partial(&headers) {
                ApplicationRowTemplate {
                    row: ApplicationRow::from(&application),
                    statuses: STATUSES,
                }
                .into_response()
            } else {
                redirect_with_notice(
                    LIST_PATH,
                    &format!("{} marked {}.", application.name, status.label()),
                )
            }
        }
        Err(e) => mutation_failed(&headers, LIST_PATH, &e),
    }
}

/// Redirect to a short-lived download link for the applicant's resume.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn resume(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Response> {
    let application = ApplicationRepository::new(state.data())
        .get(ApplicationId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("application {id}")))?;
    let Some(key) = application.resume_url.as_deref() else {
        return Ok(redirect_with_error(LIST_PATH, "This application has no resume."));
    };

    let url = state
        .data()
        .signed_url(state.resume_bucket(), key, state.signed_url_ttl())
        .await?;
    tracing::info!(application_id = id, "Resume link issued");
    Ok(Redirect::to(&url).into_response())
}
