//! Messages submitted through the contact forms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;
use crate::types::{Email, MessageId};
use crate::validation::{self, ValidationError};

/// A row of the `user_messages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub id: MessageId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl UserMessage {
    /// Text used for the dashboard toast when this message arrives.
    #[must_use]
    pub fn toast_text(&self) -> String {
        match self.subject.as_deref().filter(|s| !s.is_empty()) {
            Some(subject) => format!("New message from {}: {subject}", self.name),
            None => format!("New message from {}", self.name),
        }
    }
}

/// Insert payload for a contact message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMessage {
    pub name: String,
    pub email: Email,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
}

/// The contact form as submitted by the browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    /// Check required fields and build the insert payload.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a blank name or message, or an invalid email.
    pub fn validate(&self) -> Result<NewMessage, ValidationError> {
        let name = validation::required("Name", &self.name)?;
        validation::max_len("Name", &name, 120)?;
        validation::required("Email", &self.email)?;
        let email = Email::parse(&self.email)?;
        let subject = validation::optional(Some(&self.subject));
        if let Some(subject) = &subject {
            validation::max_len("Subject", subject, 200)?;
        }
        let message = validation::required("Message", &self.message)?;
        validation::max_len("Message", &message, 5000)?;
        Ok(NewMessage {
            name,
            email,
            subject,
            message,
            is_read: false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_rejected() {
        assert_eq!(
            ContactForm::default().validate(),
            Err(ValidationError::Required { field: "Name" })
        );
        let form = ContactForm {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            message: "  ".to_string(),
            ..ContactForm::default()
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::Required { field: "Message" })
        );
    }

    #[test]
    fn test_valid_form_builds_unread_message() {
        let form = ContactForm {
            name: " Jane ".to_string(),
            email: "JANE@example.com".to_string(),
            subject: String::new(),
            message: "My floor jack leaks oil.".to_string(),
        };
        let message = form.validate().unwrap();
        assert_eq!(message.name, "Jane");
        assert_eq!(message.subject, None);
        assert!(!message.is_read);
        assert_eq!(message.email.as_str(), "jane@example.com");
    }

    #[test]
    fn test_toast_text() {
        let row: UserMessage = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Jane",
            "email": "jane@example.com",
            "subject": "Quote",
            "message": "Hi",
            "is_read": null,
            "created_at": "2024-05-01T10:00:00+00:00"
        }))
        .unwrap();
        assert!(!row.is_read);
        assert_eq!(row.toast_text(), "New message from Jane: Quote");
    }
}
