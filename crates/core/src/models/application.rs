//! Job applications and the resume upload that accompanies them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JobListing, null_as_default};
use crate::types::{ApplicationId, ApplicationStatus, Email, JobId, UserId};
use crate::validation::{self, ValidationError};

/// A row of the `applications` table.
///
/// The job snapshot fields (`position`, `job_type`, `location`, `salary`) are
/// copied from the listing when the application is submitted, so the
/// applicant's results page still reads correctly after a listing is edited
/// or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub job_id: Option<JobId>,
    pub name: String,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: String,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    /// Storage object key of the uploaded resume, relative to the resume bucket.
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewApplication {
    pub user_id: Option<UserId>,
    pub job_id: Option<JobId>,
    pub name: String,
    pub email: Email,
    pub position: String,
    pub job_type: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
}

impl NewApplication {
    /// Assemble the row from validated applicant details and the job applied to.
    #[must_use]
    pub fn new(
        details: ApplicantDetails,
        job: Option<&JobListing>,
        user_id: Option<UserId>,
        resume_key: Option<String>,
    ) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let position = details
            .position
            .or_else(|| job.map(|j| j.title.clone()))
            .unwrap_or_default();
        Self {
            user_id,
            job_id: job.map(|j| j.id),
            name: details.name,
            email: details.email,
            position,
            job_type: job.and_then(|j| non_empty(&j.employment_type)),
            location: job.and_then(|j| non_empty(&j.location)),
            salary: job.and_then(|j| non_empty(&j.salary)),
            resume_url: resume_key,
            cover_letter: details.cover_letter,
            status: ApplicationStatus::Pending,
        }
    }
}

/// Text fields of the application form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub cover_letter: String,
}

/// Applicant details that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantDetails {
    pub name: String,
    pub email: Email,
    pub position: Option<String>,
    pub cover_letter: Option<String>,
}

impl ApplicationForm {
    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the name is blank or the email is invalid.
    pub fn validate(&self) -> Result<ApplicantDetails, ValidationError> {
        let name = validation::required("Full name", &self.name)?;
        validation::max_len("Full name", &name, 120)?;
        validation::required("Email", &self.email)?;
        let email = Email::parse(&self.email)?;
        let cover_letter = validation::optional(Some(&self.cover_letter));
        if let Some(letter) = &cover_letter {
            validation::max_len("Cover letter", letter, 5000)?;
        }
        Ok(ApplicantDetails {
            name,
            email,
            position: validation::optional(Some(&self.position)),
            cover_letter,
        })
    }
}

/// Largest resume accepted, in bytes.
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

const RESUME_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

const MAX_KEY_NAME_LEN: usize = 100;

/// Folder inside the resume bucket that uploads land in.
pub const RESUME_FOLDER: &str = "resumes";

/// Check a resume's filename and size before it is uploaded.
///
/// # Errors
///
/// Returns [`ValidationError::UnsupportedResumeType`] or
/// [`ValidationError::ResumeTooLarge`].
pub fn check_resume(filename: &str, len: usize) -> Result<(), ValidationError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !RESUME_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedResumeType);
    }
    if len > MAX_RESUME_BYTES {
        return Err(ValidationError::ResumeTooLarge {
            max_mib: MAX_RESUME_BYTES / (1024 * 1024),
        });
    }
    Ok(())
}

/// Object key for an uploaded resume: `resumes/<unix-millis>_<sanitized name>`.
///
/// The timestamp prefix keeps two uploads of `cv.pdf` from colliding.
/// Directory components and characters outside `[A-Za-z0-9._-]` are stripped
/// so the key is safe to embed in a storage URL.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use jack_machine_core::models::application::resume_object_key;
///
/// let at = Utc.timestamp_millis_opt(1_717_000_000_123).unwrap();
/// assert_eq!(resume_object_key("../My CV (final).pdf", at), "resumes/1717000000123_My_CV_final_.pdf");
/// ```
#[must_use]
pub fn resume_object_key(filename: &str, at: DateTime<Utc>) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let mut sanitized = String::with_capacity(base.len());
    for c in base.chars() {
        let keep = c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_');
        let c = if keep { c } else { '_' };
        if c == '_' && sanitized.ends_with('_') {
            continue;
        }
        sanitized.push(c);
    }
    let sanitized = sanitized.trim_start_matches('.');
    // ASCII only at this point, so byte offsets are char boundaries.
    let start = sanitized.len().saturating_sub(MAX_KEY_NAME_LEN);
    let sanitized = sanitized.get(start..).unwrap_or(sanitized);
    let sanitized = if sanitized.is_empty() {
        "resume"
    } else {
        sanitized
    };

    format!("{RESUME_FOLDER}/{}_{sanitized}", at.timestamp_millis())
}
