//! Admin job listing management.
//!
//! Skills are edited as one comma-separated field.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use jack_machine_core::{JobForm, JobId, filter_by_query};

use super::{ListQuery, deleted, mutation_failed, redirect_with_notice, wants_partial};
use crate::db::JobRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::SessionUser;
use crate::routes::views::JobCard;
use crate::state::AppState;

const LIST_PATH: &str = "/admin/careers";

#[derive(Template, WebTemplate)]
#[template(path = "admin/careers.html")]
pub struct CareersTemplate {
    pub admin: SessionUser,
    pub current_path: &'static str,
    pub q: String,
    pub jobs: Vec<JobCard>,
    pub total: usize,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/_job_row.html")]
pub struct JobRowTemplate {
    pub job: JobCard,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/job_form.html")]
pub struct JobFormTemplate {
    pub admin: SessionUser,
    pub current_path: &'static str,
    pub heading: &'static str,
    pub action: String,
    pub form: JobForm,
    pub error: Option<String>,
}

impl JobFormTemplate {
    fn create(admin: SessionUser, form: JobForm, error: Option<String>) -> Self {
        Self {
            admin,
            current_path: LIST_PATH,
            heading: "New Job Listing",
            action: LIST_PATH.to_string(),
            form,
            error,
        }
    }

    fn edit(admin: SessionUser, id: i64, form: JobForm, error: Option<String>) -> Self {
        Self {
            admin,
            current_path: LIST_PATH,
            heading: "Edit Job Listing",
            action: format!("{LIST_PATH}/{id}"),
            form,
            error,
        }
    }
}

fn row_or_redirect(headers: &HeaderMap, job: &JobCard, notice: &str) -> Response {
    if wants_partial(headers) {
        JobRowTemplate { job: job.clone() }.into_response()
    } else {
        redirect_with_notice(LIST_PATH, notice)
    }
}

/// List job listings, filtered by title or department.
#[instrument(skip(state, auth, query), fields(user_id = %auth.user.id, q = ?query.q))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (jobs, total, error) = match JobRepository::new(state.data()).list().await {
        Ok(all) => (
            filter_by_query(&all, query.q.as_deref())
                .iter()
                .map(JobCard::from)
                .collect(),
            all.len(),
            query.error.clone(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load job listings");
            (Vec::new(), 0, Some(e.user_message()))
        }
    };

    CareersTemplate {
        admin: auth.user,
        current_path: LIST_PATH,
        q: query.search(),
        jobs,
        total,
        error,
        notice: query.notice,
    }
}

/// Blank editor.
pub async fn new_form(RequireAdmin(auth): RequireAdmin) -> impl IntoResponse {
    JobFormTemplate::create(auth.user, JobForm::default(), None)
}

/// Editor prefilled from the stored row.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn edit_form(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let job = JobRepository::new(state.data())
        .get(JobId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job {id}")))?;
    Ok(JobFormTemplate::edit(auth.user, id, JobForm::from_job(&job), None))
}

/// Create a job listing.
#[instrument(skip(state, auth, headers, form), fields(user_id = %auth.user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    headers: HeaderMap,
    Form(form): Form<JobForm>,
) -> Response {
    let new = match form.validate() {
        Ok(new) => new,
        Err(e) => return JobFormTemplate::create(auth.user, form, Some(e.to_string())).into_response(),
    };

    match JobRepository::new(state.data()).create(&new).await {
        Ok(job) => {
            state.catalog().invalidate().await;
            tracing::info!(job_id = %job.id, "Job listing created");
            row_or_redirect(&headers, &JobCard::from(&job), "Job listing created.")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Job listing create failed");
            JobFormTemplate::create(auth.user, form, Some(e.user_message())).into_response()
        }
    }
}

/// Replace a job listing's fields.
#[instrument(skip(state, auth, headers, form), fields(user_id = %auth.user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<JobForm>,
) -> Response {
    let new = match form.validate() {
        Ok(new) => new,
        Err(e) => return JobFormTemplate::edit(auth.user, id, form, Some(e.to_string())).into_response(),
    };

    match JobRepository::new(state.data()).update(JobId::new(id), &new).await {
        Ok(job) => {
            state.catalog().invalidate().await;
            tracing::info!(job_id = %job.id, "Job listing updated");
            row_or_redirect(&headers, &JobCard::from(&job), "Job listing updated.")
        }
        Err(e) if wants_partial(&headers) => mutation_failed(&headers, LIST_PATH, &e),
        Err(e) => {
            tracing::warn!(error = %e, "Job listing update failed");
            JobFormTemplate::edit(auth.user, id, form, Some(e.user_message())).into_response()
        }
    }
}

/// Delete a job listing.
#[instrument(skip(state, auth, headers), fields(user_id = %auth.user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    match JobRepository::new(state.data()).delete(JobId::new(id)).await {
        Ok(()) => {
            state.catalog().invalidate().await;
            tracing::info!(job_id = id, "Job listing deleted");
            deleted(&headers, LIST_PATH, "Job listing deleted.")
        }
        Err(e) => mutation_failed(&headers, LIST_PATH, &e),
    }
}
