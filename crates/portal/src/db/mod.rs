//! Typed repositories over the external data service.
//!
//! # Tables
//!
//! - `services` - Repair services shown on the public site
//! - `job_listings` - Open positions
//! - `applications` - Job applications (resume stored in the `resumes` bucket)
//! - `user_messages` - Contact form submissions
//! - `activity_log` - Admin activity feed (written by the data service)
//!
//! Every repository borrows a [`DataService`] and decodes its rows into
//! `jack_machine_core` models. A row that does not decode is reported as
//! [`RepositoryError::DataCorruption`] rather than skipped.

pub mod activity;
pub mod applications;
pub mod jobs;
pub mod messages;
pub mod services;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use jack_machine_core::ValidationError;

use crate::backend::{BackendError, DataService, Row};

pub use activity::ActivityRepository;
pub use applications::ApplicationRepository;
pub use jobs::JobRepository;
pub use messages::MessageRepository;
pub use services::ServiceRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The data service failed or refused the request.
    #[error("data service error: {0}")]
    Backend(BackendError),

    /// A row did not have the expected shape.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested row was not found.
    #[error("not found")]
    NotFound,

    /// Input failed validation before reaching the data service.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<BackendError> for RepositoryError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound => Self::NotFound,
            other => Self::Backend(other),
        }
    }
}

impl RepositoryError {
    /// Message for the inline error banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(err) => err.user_message(),
            Self::DataCorruption(_) => {
                "The data service returned a record that could not be read.".to_string()
            }
            Self::NotFound => "The requested record no longer exists.".to_string(),
            Self::Validation(err) => err.to_string(),
        }
    }
}

/// Decode every row of a result set.
fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Result<Vec<T>, RepositoryError> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

/// Decode one row.
fn decode_row<T: DeserializeOwned>(table: &str, row: Row) -> Result<T, RepositoryError> {
    serde_json::from_value(row).map_err(|e| {
        tracing::error!(table, error = %e, "Row failed to decode");
        RepositoryError::DataCorruption(format!("{table}: {e}"))
    })
}

/// Encode an insert or update payload.
fn encode<T: Serialize>(table: &str, value: &T) -> Result<Row, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("{table}: {e}")))
}

/// First row of a query, if any.
async fn select_one<T: DeserializeOwned>(
    data: &dyn DataService,
    table: &str,
    id: i64,
) -> Result<Option<T>, RepositoryError> {
    let query = crate::backend::RowQuery::new().eq("id", id).limit(1);
    let row = data.select(table, &query).await?.into_iter().next();
    row.map(|r| decode_row(table, r)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_not_found_maps_to_not_found() {
        assert!(matches!(
            RepositoryError::from(BackendError::NotFound),
            RepositoryError::NotFound
        ));
        let api = RepositoryError::from(BackendError::Api {
            status: 409,
            message: "duplicate key".to_string(),
        });
        assert_eq!(api.user_message(), "duplicate key");
    }

    #[test]
    fn test_bad_row_is_data_corruption() {
        let result: Result<Vec<jack_machine_core::Service>, _> =
            decode_rows("services", vec![serde_json::json!({"id": "not-a-number"})]);
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }
}
