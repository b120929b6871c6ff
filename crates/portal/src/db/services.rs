//! Service repository.

use jack_machine_core::{NewService, Service, ServiceId};

use super::{RepositoryError, decode_row, decode_rows, encode, select_one};
use crate::backend::{DataService, RowQuery};

/// Table holding repair services.
pub const TABLE: &str = "services";

/// Repository for the `services` table.
pub struct ServiceRepository<'a> {
    data: &'a dyn DataService,
}

impl<'a> ServiceRepository<'a> {
    #[must_use]
    pub const fn new(data: &'a dyn DataService) -> Self {
        Self { data }
    }

    /// All services, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or a row is malformed.
    pub async fn list(&self) -> Result<Vec<Service>, RepositoryError> {
        let rows = self.data.select(TABLE, &RowQuery::newest_first()).await?;
        decode_rows(TABLE, rows)
    }

    /// Get a service by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or the row is malformed.
    pub async fn get(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError> {
        select_one(self.data, TABLE, id.as_i64()).await
    }

    /// Number of services.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the count fails.
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.data.count(TABLE, &RowQuery::new()).await?)
    }

    /// Insert a service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    pub async fn create(&self, service: &NewService) -> Result<Service, RepositoryError> {
        let row = self.data.insert(TABLE, encode(TABLE, service)?).await?;
        decode_row(TABLE, row)
    }

    /// Replace a service's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    pub async fn update(
        &self,
        id: ServiceId,
        service: &NewService,
    ) -> Result<Service, RepositoryError> {
        let row = self
            .data
            .update(TABLE, id.as_i64(), encode(TABLE, service)?)
            .await?;
        decode_row(TABLE, row)
    }

    /// Delete a service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    pub async fn delete(&self, id: ServiceId) -> Result<(), RepositoryError> {
        Ok(self.data.delete(TABLE, id.as_i64()).await?)
    }
}
