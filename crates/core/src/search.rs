//! In-memory search over rows that were already fetched.
//!
//! Admin list pages load the whole table and narrow it with a
//! case-insensitive substring match on one to three text columns.

use crate::models::{Application, JobListing, Service, UserMessage};

/// A row that can be matched against a free-text query.
pub trait Searchable {
    /// Columns the query is matched against.
    fn search_fields(&self) -> Vec<&str>;

    /// Whether any search field contains `needle`, which must already be lowercase.
    fn matches_lowercase(&self, needle: &str) -> bool {
        self.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

impl Searchable for Application {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }
}

impl Searchable for Service {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.category.as_str()]
    }
}

impl Searchable for JobListing {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.department.as_str()]
    }
}

impl Searchable for UserMessage {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.email.as_str()];
        if let Some(subject) = &self.subject {
            fields.push(subject);
        }
        fields
    }
}

/// Normalize a raw query string. Blank queries become `None`.
#[must_use]
pub fn normalize_query(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase)
}

/// Rows matching `query`, in their original order.
///
/// A blank or missing query returns every row.
pub fn filter_by_query<T: Searchable + Clone>(rows: &[T], query: Option<&str>) -> Vec<T> {
    match normalize_query(query) {
        Some(needle) => rows
            .iter()
            .filter(|row| row.matches_lowercase(&needle))
            .cloned()
            .collect(),
        None => rows.to_vec(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ApplicationStatus;

    fn application(id: i64, name: &str, email: &str, status: &str) -> Application {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "email": email,
            "status": status,
            "created_at": "2024-05-01T10:00:00+00:00"
        }))
        .unwrap()
    }

    #[test]
    fn test_filter_matches_name_or_email_ignoring_case() {
        let rows = vec![
            application(1, "Jane Doe", "jd@example.com", "Pending"),
            application(2, "Bob Smith", "JANE.s@example.com", "shortlisted"),
            application(3, "Carl Rivers", "carl@example.com", "Rejected"),
        ];

        let hits = filter_by_query(&rows, Some("jane"));
        let ids: Vec<i64> = hits.iter().map(|a| a.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(hits[1].status, ApplicationStatus::Shortlisted);
    }

    #[test]
    fn test_blank_query_returns_everything() {
        let rows = vec![application(1, "Jane", "j@example.com", "pending")];
        assert_eq!(filter_by_query(&rows, Some("   ")).len(), 1);
        assert_eq!(filter_by_query(&rows, None).len(), 1);
    }

    #[test]
    fn test_message_subject_is_searchable() {
        let message: UserMessage = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Jane",
            "email": "jane@example.com",
            "subject": "Bottle Jack Quote",
            "message": "Hello",
            "created_at": "2024-05-01T10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(filter_by_query(&[message], Some("BOTTLE")).len(), 1);
    }
}
