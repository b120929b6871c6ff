//! Display-ready rows shared by the public, user and admin templates.
//!
//! Templates never format dates or map enums themselves; they receive these
//! structs instead.

use chrono::{DateTime, Utc};

use jack_machine_core::{
    Activity, Application, ApplicationStatus, JobListing, Service, UserMessage,
};

/// "May 1, 2024"
#[must_use]
pub fn display_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

#[derive(Debug, Clone)]
pub struct ServiceCard {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub description: String,
    pub clients: i64,
    pub image_url: Option<String>,
    pub icon: &'static str,
    pub glyph: &'static str,
    pub created: String,
}

impl From<&Service> for ServiceCard {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.as_i64(),
            name: service.name.clone(),
            category: service.category.clone(),
            description: service.description.clone(),
            clients: service.clients,
            image_url: service.image_url.clone(),
            icon: service.icon.as_str(),
            glyph: service.icon.glyph(),
            created: display_date(&service.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobCard {
    pub id: i64,
    pub title: String,
    pub department: String,
    pub location: String,
    pub employment_type: String,
    pub salary: String,
    pub description: String,
    pub skills: Vec<String>,
    pub applications: i64,
    pub created: String,
}

impl From<&JobListing> for JobCard {
    fn from(job: &JobListing) -> Self {
        Self {
            id: job.id.as_i64(),
            title: job.title.clone(),
            department: job.department.clone(),
            location: job.location.clone(),
            employment_type: job.employment_type.clone(),
            salary: job.salary.clone(),
            description: job.description.clone(),
            skills: job.skills.clone(),
            applications: job.applications,
            created: display_date(&job.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub position: String,
    pub job_type: String,
    pub location: String,
    pub cover_letter: Option<String>,
    pub has_resume: bool,
    pub status: ApplicationStatus,
    pub created: String,
}

impl From<&Application> for ApplicationRow {
    fn from(application: &Application) -> Self {
        Self {
            id: application.id.as_i64(),
            name: application.name.clone(),
            email: application.email.clone(),
            position: application.position.clone(),
            job_type: application.job_type.clone().unwrap_or_default(),
            location: application.location.clone().unwrap_or_default(),
            cover_letter: application.cover_letter.clone(),
            has_resume: application.resume_url.is_some(),
            status: application.status,
            created: display_date(&application.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub is_read: bool,
    pub created: String,
}

impl From<&UserMessage> for MessageRow {
    fn from(message: &UserMessage) -> Self {
        Self {
            id: message.id.as_i64(),
            name: message.name.clone(),
            email: message.email.clone(),
            subject: message.subject.clone().unwrap_or_default(),
            message: message.message.clone(),
            is_read: message.is_read,
            created: display_date(&message.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub glyph: &'static str,
    pub description: String,
    pub created: String,
}

impl From<&Activity> for ActivityRow {
    fn from(activity: &Activity) -> Self {
        Self {
            glyph: activity.action_type.glyph(),
            description: activity.description.clone(),
            created: display_date(&activity.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_display_date() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(display_date(&at), "May 1, 2024");
    }
}
