//! Activity log repository. Read-only: the data service writes the log.

use jack_machine_core::Activity;

use super::{RepositoryError, decode_rows};
use crate::backend::{DataService, RowQuery};

/// Table holding the admin activity feed.
pub const TABLE: &str = "activity_log";

/// Repository for the `activity_log` table.
pub struct ActivityRepository<'a> {
    data: &'a dyn DataService,
}

impl<'a> ActivityRepository<'a> {
    #[must_use]
    pub const fn new(data: &'a dyn DataService) -> Self {
        Self { data }
    }

    /// The `limit` most recent entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or a row is malformed.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Activity>, RepositoryError> {
        let rows = self
            .data
            .select(TABLE, &RowQuery::newest_first().limit(limit))
            .await?;
        decode_rows(TABLE, rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::MemoryBackend;
    use jack_machine_core::ActivityKind;

    #[tokio::test]
    async fn test_recent_is_newest_first_and_limited() {
        let backend = MemoryBackend::new();
        for (i, kind) in ["application", "message", "service", "career", "account", "audit"]
            .iter()
            .enumerate()
        {
            backend.seed_row(
                TABLE,
                json!({
                    "description": format!("event {i}"),
                    "action_type": kind,
                    "created_at": format!("2024-05-0{}T10:00:00Z", i + 1),
                }),
            );
        }

        let recent = ActivityRepository::new(&backend).recent(5).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].description, "event 5");
        assert_eq!(recent[0].action_type, ActivityKind::Other("audit".to_string()));
    }
}
