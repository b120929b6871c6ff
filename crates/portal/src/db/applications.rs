//! Application repository.

use jack_machine_core::{Application, ApplicationId, ApplicationStatus, NewApplication, UserId};

use super::{RepositoryError, decode_row, decode_rows, encode, select_one};
use crate::backend::{DataService, RowQuery};

/// Table holding job applications.
pub const TABLE: &str = "applications";

/// Repository for the `applications` table.
pub struct ApplicationRepository<'a> {
    data: &'a dyn DataService,
}

impl<'a> ApplicationRepository<'a> {
    #[must_use]
    pub const fn new(data: &'a dyn DataService) -> Self {
        Self { data }
    }

    /// Applications newest first, optionally limited to one status.
    ///
    /// Stored status text may differ in case, so the status filter runs on
    /// the decoded rows rather than in the data service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or a row is malformed.
    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, RepositoryError> {
        let rows = self.data.select(TABLE, &RowQuery::newest_first()).await?;
        let mut applications: Vec<Application> = decode_rows(TABLE, rows)?;
        if let Some(status) = status {
            applications.retain(|application| application.status == status);
        }
        Ok(applications)
    }

    /// One applicant's own applications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or a row is malformed.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Application>, RepositoryError> {
        let query = RowQuery::newest_first().eq("user_id", user_id);
        let rows = self.data.select(TABLE, &query).await?;
        decode_rows(TABLE, rows)
    }

    /// Get an application by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or the row is malformed.
    pub async fn get(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        select_one(self.data, TABLE, id.as_i64()).await
    }

    /// Number of applications still awaiting review, whatever the casing of
    /// their stored status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or a row is malformed.
    pub async fn count_pending(&self) -> Result<u64, RepositoryError> {
        let pending = self.list(Some(ApplicationStatus::Pending)).await?;
        Ok(pending.len() as u64)
    }

    /// Insert an application.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    pub async fn create(
        &self,
        application: &NewApplication,
    ) -> Result<Application, RepositoryError> {
        let row = self.data.insert(TABLE, encode(TABLE, application)?).await?;
        decode_row(TABLE, row)
    }

    /// Change an application's review status and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    pub async fn set_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        let patch = serde_json::json!({ "status": status.as_str() });
        let row = self.data.update(TABLE, id.as_i64(), patch).await?;
        decode_row(TABLE, row)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::backend::memory::CallKind;

    fn seed(backend: &MemoryBackend, name: &str, status: &str) {
        backend.seed_row(
            TABLE,
            json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "position": "Field Technician",
                "status": status,
            }),
        );
    }

    fn mixed_case_backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        seed(&backend, "Ana", "Pending");
        seed(&backend, "Ben", "pending");
        seed(&backend, "Cal", "SHORTLISTED");
        seed(&backend, "Dee", "rejected");
        backend
    }

    #[tokio::test]
    async fn test_count_pending_ignores_status_case() {
        let backend = mixed_case_backend();
        let repo = ApplicationRepository::new(&backend);

        let decoded = repo
            .list(None)
            .await
            .unwrap()
            .iter()
            .filter(|a| a.status == ApplicationStatus::Pending)
            .count();
        assert_eq!(decoded, 2);
        assert_eq!(repo.count_pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_status_filter_matches_any_case() {
        let backend = mixed_case_backend();
        let repo = ApplicationRepository::new(&backend);

        let pending = repo.list(Some(ApplicationStatus::Pending)).await.unwrap();
        let mut names: Vec<_> = pending.iter().map(|a| a.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["Ana", "Ben"]);

        let shortlisted = repo.list(Some(ApplicationStatus::Shortlisted)).await.unwrap();
        assert_eq!(shortlisted.len(), 1);
        assert_eq!(backend.calls_of(CallKind::Select).len(), 2);
    }
}
