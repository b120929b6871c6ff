//! Job listing repository.

use jack_machine_core::{JobId, JobListing, NewJobListing};

use super::{RepositoryError, decode_row, decode_rows, encode, select_one};
use crate::backend::{DataService, RowQuery};

/// Table holding open positions.
pub const TABLE: &str = "job_listings";

/// Repository for the `job_listings` table.
pub struct JobRepository<'a> {
    data: &'a dyn DataService,
}

impl<'a> JobRepository<'a> {
    #[must_use]
    pub const fn new(data: &'a dyn DataService) -> Self {
        Self { data }
    }

    /// All listings, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or a row is malformed.
    pub async fn list(&self) -> Result<Vec<JobListing>, RepositoryError> {
        let rows = self.data.select(TABLE, &RowQuery::newest_first()).await?;
        decode_rows(TABLE, rows)
    }

    /// Get a listing by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or the row is malformed.
    pub async fn get(&self, id: JobId) -> Result<Option<JobListing>, RepositoryError> {
        select_one(self.data, TABLE, id.as_i64()).await
    }

    /// Number of listings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the count fails.
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.data.count(TABLE, &RowQuery::new()).await?)
    }

    /// Insert a listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    pub async fn create(&self, job: &NewJobListing) -> Result<JobListing, RepositoryError> {
        let row = self.data.insert(TABLE, encode(TABLE, job)?).await?;
        decode_row(TABLE, row)
    }

    /// Replace a listing's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    pub async fn update(
        &self,
        id: JobId,
        job: &NewJobListing,
    ) -> Result<JobListing, RepositoryError> {
        let row = self
            .data
            .update(TABLE, id.as_i64(), encode(TABLE, job)?)
            .await?;
        decode_row(TABLE, row)
    }

    /// Delete a listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    pub async fn delete(&self, id: JobId) -> Result<(), RepositoryError> {
        Ok(self.data.delete(TABLE, id.as_i64()).await?)
    }
}
