//! Contact message repository.

use jack_machine_core::{MessageId, NewMessage, UserMessage};

use super::{RepositoryError, decode_row, decode_rows, encode};
use crate::backend::{DataService, RowQuery};

/// Table holding contact form submissions.
pub const TABLE: &str = "user_messages";

/// Repository for the `user_messages` table.
pub struct MessageRepository<'a> {
    data: &'a dyn DataService,
}

impl<'a> MessageRepository<'a> {
    #[must_use]
    pub const fn new(data: &'a dyn DataService) -> Self {
        Self { data }
    }

    /// All messages, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the fetch fails or a row is malformed.
    pub async fn list(&self) -> Result<Vec<UserMessage>, RepositoryError> {
        let rows = self.data.select(TABLE, &RowQuery::newest_first()).await?;
        decode_rows(TABLE, rows)
    }

    /// Number of messages nobody has opened yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the count fails.
    pub async fn count_unread(&self) -> Result<u64, RepositoryError> {
        let query = RowQuery::new().eq("is_read", false);
        Ok(self.data.count(TABLE, &query).await?)
    }

    /// Store a contact form submission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    pub async fn create(&self, message: &NewMessage) -> Result<UserMessage, RepositoryError> {
        let row = self.data.insert(TABLE, encode(TABLE, message)?).await?;
        decode_row(TABLE, row)
    }

    /// Flag a message as read and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    pub async fn mark_read(&self, id: MessageId) -> Result<UserMessage, RepositoryError> {
        let patch = serde_json::json!({ "is_read": true });
        let row = self.data.update(TABLE, id.as_i64(), patch).await?;
        decode_row(TABLE, row)
    }

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this id.
    pub async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        Ok(self.data.delete(TABLE, id.as_i64()).await?)
    }
}
