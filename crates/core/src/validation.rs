//! Form validation shared by the portal and the CLI.
//!
//! Everything here runs before a request leaves the process: a form that
//! fails validation never reaches the data service.

use crate::types::EmailError;

/// A form field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be a whole number")]
    NotANumber { field: &'static str },

    #[error("{field} has an unrecognized value")]
    Unrecognized { field: &'static str },

    #[error("{0}")]
    Email(#[from] EmailError),

    #[error("phone number must contain only digits")]
    InvalidPhone,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("resume must be a PDF, DOC, or DOCX file")]
    UnsupportedResumeType,

    #[error("resume must be at most {max_mib} MB")]
    ResumeTooLarge { max_mib: usize },
}

/// Minimum password length accepted by the sign-up and login forms.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Trim a required field, rejecting blank input.
///
/// # Errors
///
/// Returns [`ValidationError::Required`] if the trimmed value is empty.
pub fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(trimmed.to_string())
}

/// Trim an optional field, mapping blank input to `None`.
#[must_use]
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Enforce a maximum character count.
///
/// # Errors
///
/// Returns [`ValidationError::TooLong`] when `value` has more than `max` characters.
pub fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Check a password against the minimum length.
///
/// # Errors
///
/// Returns [`ValidationError::PasswordTooShort`] for short passwords.
pub fn password(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("name", "  Jane ").unwrap(), "Jane");
        assert_eq!(
            required("name", " \t "),
            Err(ValidationError::Required { field: "name" })
        );
    }

    #[test]
    fn test_optional_blank_is_none() {
        assert_eq!(optional(Some("   ")), None);
        assert_eq!(optional(None), None);
        assert_eq!(optional(Some(" hi ")), Some("hi".to_string()));
    }

    #[test]
    fn test_max_len_counts_chars() {
        assert!(max_len("subject", "ééé", 3).is_ok());
        assert!(max_len("subject", "éééé", 3).is_err());
    }

    #[test]
    fn test_password_min_length() {
        assert!(password("12345").is_err());
        assert!(password("123456").is_ok());
    }

    #[test]
    fn test_error_messages_read_naturally() {
        let err = ValidationError::Required { field: "Message" };
        assert_eq!(err.to_string(), "Message is required");
    }
}
