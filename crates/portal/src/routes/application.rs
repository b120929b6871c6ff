//! Job application page.
//!
//! `GET /application/{id}` shows the job and the form; `POST` takes the
//! multipart form with an optional resume file and hands it to
//! [`submit_application`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State, multipart::Field},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use jack_machine_core::{ApplicationForm, JobId, JobListing};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::SessionUser;
use crate::routes::views::JobCard;
use crate::services::applications::{ResumeUpload, Submission, submit_application};
use crate::state::AppState;

/// Application page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/application.html")]
pub struct ApplicationTemplate {
    pub viewer: Option<SessionUser>,
    pub job: JobCard,
    pub form: ApplicationForm,
    pub error: Option<String>,
}

async fn find_job(state: &AppState, id: JobId) -> Result<JobListing> {
    state
        .catalog()
        .job(state.data(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job {id}")))
}

/// Display the application form for a job.
#[instrument(skip(state, viewer))]
pub async fn show(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let job = find_job(&state, JobId::new(id)).await?;
    let viewer = viewer.map(|auth| auth.user);
    let form = ApplicationForm {
        name: viewer.as_ref().map(|u| u.username.clone()).unwrap_or_default(),
        email: viewer
            .as_ref()
            .map(|u| u.email.clone())
            .filter(|e| e.contains('@'))
            .unwrap_or_default(),
        position: job.title.clone(),
        cover_letter: String::new(),
    };
    Ok(ApplicationTemplate {
        viewer,
        job: JobCard::from(&job),
        form,
        error: None,
    })
}

/// Handle the application form.
#[instrument(skip(state, viewer, multipart))]
pub async fn submit(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Response> {
    let job = find_job(&state, JobId::new(id)).await?;
    let viewer = viewer.map(|auth| auth.user);
    let (form, resume) = read_form(multipart).await?;

    let submission = Submission {
        form: &form,
        job: Some(&job),
        user_id: viewer.as_ref().map(|u| u.id),
        resume,
    };
    match submit_application(state.data(), state.resume_bucket(), submission).await {
        Ok(_) if viewer.is_some() => Ok(Redirect::to("/users/result").into_response()),
        Ok(_) => Ok(Redirect::to("/careers?applied=1").into_response()),
        Err(e) => {
            tracing::warn!(error = %e, "Application rejected");
            Ok(ApplicationTemplate {
                viewer,
                job: JobCard::from(&job),
                error: Some(e.user_message()),
                form,
            }
            .into_response())
        }
    }
}

/// Collect the text fields and the resume from the multipart body.
///
/// An empty file input arrives as a part with no filename and no bytes and
/// counts as no resume.
async fn read_form(mut multipart: Multipart) -> Result<(ApplicationForm, Option<ResumeUpload>)> {
    let mut form = ApplicationForm::default();
    let mut resume = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => form.name = text(field).await?,
            "email" => form.email = text(field).await?,
            "position" => form.position = text(field).await?,
            "cover_letter" => form.cover_letter = text(field).await?,
            "resume" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if !filename.is_empty() || !bytes.is_empty() {
                    resume = Some(ResumeUpload {
                        filename,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok((form, resume))
}

async fn text(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))
}
