//! Job listings shown on the careers pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;
use crate::types::JobId;
use crate::validation::{self, ValidationError};

/// A row of the `job_listings` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub id: JobId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub department: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    /// Full-time, part-time, contract...
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub employment_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub salary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    /// Denormalized count kept by the data service.
    #[serde(default, deserialize_with = "null_as_default")]
    pub applications: i64,
    pub created_at: DateTime<Utc>,
}

/// Insert/update payload for a job listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJobListing {
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "type", default)]
    pub employment_type: String,
    #[serde(default)]
    pub salary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl NewJobListing {
    /// Trim fields, drop blank skills and enforce the non-empty title rule.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the title is blank or too long.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let title = validation::required("Job title", &self.title)?;
        validation::max_len("Job title", &title, 120)?;
        Ok(Self {
            title,
            department: self.department.trim().to_string(),
            location: self.location.trim().to_string(),
            employment_type: self.employment_type.trim().to_string(),
            salary: self.salary.trim().to_string(),
            description: self.description.trim().to_string(),
            skills: self
                .skills
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}

/// Split a comma-separated skills field.
///
/// ```
/// use jack_machine_core::models::job::parse_skills;
///
/// assert_eq!(parse_skills("Welding, hydraulics,, CDL "), vec!["Welding", "hydraulics", "CDL"]);
/// ```
#[must_use]
pub fn parse_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// The admin job editor as submitted by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, rename = "type")]
    pub employment_type: String,
    #[serde(default)]
    pub salary: String,
    #[serde(default)]
    pub description: String,
    /// Comma-separated.
    #[serde(default)]
    pub skills: String,
}

impl JobForm {
    /// Build a validated [`NewJobListing`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the title is blank.
    pub fn validate(&self) -> Result<NewJobListing, ValidationError> {
        NewJobListing {
            title: self.title.clone(),
            department: self.department.clone(),
            location: self.location.clone(),
            employment_type: self.employment_type.clone(),
            salary: self.salary.clone(),
            description: self.description.clone(),
            skills: parse_skills(&self.skills),
        }
        .validated()
    }

    /// Prefill the editor from an existing row.
    #[must_use]
    pub fn from_job(job: &JobListing) -> Self {
        Self {
            title: job.title.clone(),
            department: job.department.clone(),
            location: job.location.clone(),
            employment_type: job.employment_type.clone(),
            salary: job.salary.clone(),
            description: job.description.clone(),
            skills: job.skills.join(", "),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_row_reads_type_column() {
        let job: JobListing = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Hydraulics Technician",
            "department": "Field Service",
            "location": "Houston, TX",
            "type": "Full-time",
            "salary": "$55k - $70k",
            "skills": ["Hydraulics", "Welding"],
            "applications": null,
            "created_at": "2024-05-01T10:00:00.123456+00:00"
        }))
        .unwrap();
        assert_eq!(job.employment_type, "Full-time");
        assert_eq!(job.applications, 0);
        assert_eq!(job.skills.len(), 2);
    }

    #[test]
    fn test_payload_writes_type_column() {
        let payload = JobForm {
            title: "Shop Assistant".to_string(),
            employment_type: "Part-time".to_string(),
            skills: "Forklift, ,Inventory".to_string(),
            ..JobForm::default()
        }
        .validate()
        .unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "Part-time");
        assert_eq!(json["skills"], serde_json::json!(["Forklift", "Inventory"]));
    }

    #[test]
    fn test_form_requires_title() {
        let result = JobForm::default().validate();
        assert_eq!(
            result,
            Err(ValidationError::Required { field: "Job title" })
        );
    }

    #[test]
    fn test_from_job_joins_skills() {
        let job: JobListing = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Driver",
            "skills": ["CDL", "Rigging"],
            "created_at": "2024-05-01T10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(JobForm::from_job(&job).skills, "CDL, Rigging");
    }
}
