//! Job application submission.
//!
//! Validation runs first and never touches the data service. When a resume is
//! attached it is uploaded before the row is inserted, and the row records the
//! key the upload returned. The two steps are not linked: an insert failure
//! after a successful upload leaves the object behind, which is logged.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use jack_machine_core::models::application::{check_resume, resume_object_key};
use jack_machine_core::{
    Application, ApplicationForm, JobListing, NewApplication, UserId, ValidationError,
};

use crate::backend::{BackendError, DataService};
use crate::db::{ApplicationRepository, RepositoryError};

/// A resume file taken from the multipart form.
pub struct ResumeUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ResumeUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeUpload")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Why a submission did not go through.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("resume upload failed: {0}")]
    Upload(BackendError),

    #[error("application insert failed: {0}")]
    Insert(RepositoryError),
}

impl SubmitError {
    /// Message for the banner above the re-rendered form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Upload(err) => err.user_message(),
            Self::Insert(err) => err.user_message(),
        }
    }
}

/// Everything a submission needs besides the data service.
#[derive(Debug)]
pub struct Submission<'a> {
    pub form: &'a ApplicationForm,
    pub job: Option<&'a JobListing>,
    pub user_id: Option<UserId>,
    pub resume: Option<ResumeUpload>,
}

/// Validate, upload the resume if any, then insert exactly one application row.
///
/// # Errors
///
/// Returns `SubmitError::Validation` before any external call when the form
/// or the resume is invalid, otherwise the failing step's error.
#[instrument(skip(data, submission), fields(job_id = ?submission.job.map(|j| j.id)))]
pub async fn submit_application(
    data: &dyn DataService,
    bucket: &str,
    submission: Submission<'_>,
) -> Result<Application, SubmitError> {
    let details = submission.form.validate()?;
    if let Some(resume) = &submission.resume {
        check_resume(&resume.filename, resume.bytes.len())?;
    }

    let resume_key = match submission.resume {
        Some(resume) => {
            let key = resume_object_key(&resume.filename, Utc::now());
            let stored = data
                .upload(bucket, &key, resume.bytes, &resume.content_type)
                .await
                .map_err(SubmitError::Upload)?;
            tracing::info!(key = %stored, "Resume uploaded");
            Some(stored)
        }
        None => None,
    };

    let application = NewApplication::new(
        details,
        submission.job,
        submission.user_id,
        resume_key.clone(),
    );
    match ApplicationRepository::new(data).create(&application).await {
        Ok(stored) => {
            tracing::info!(application_id = %stored.id, "Application submitted");
            Ok(stored)
        }
        Err(e) => {
            if let Some(key) = resume_key {
                tracing::warn!(key = %key, error = %e, "Application insert failed; resume object orphaned");
            }
            Err(SubmitError::Insert(e))
        }
    }
}
