//! Sign-up identifier handling.
//!
//! The sign-up form has a single "email or phone" box. Input made only of
//! digits is treated as a phone number in E.164-ish form (leading zeros
//! dropped, `+` prefixed); anything else must be an email address.

use core::fmt;

use crate::types::Email;
use crate::validation::ValidationError;

/// What the user typed into the identifier box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupIdentifier {
    Email(Email),
    /// Phone number including the leading `+`.
    Phone(String),
}

impl SignupIdentifier {
    /// Classify and normalize an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] for blank input,
    /// [`ValidationError::InvalidPhone`] for an all-zero number, or the email
    /// parse error otherwise.
    ///
    /// ```
    /// use jack_machine_core::SignupIdentifier;
    ///
    /// assert_eq!(
    ///     SignupIdentifier::parse("0015551234567").unwrap(),
    ///     SignupIdentifier::Phone("+15551234567".to_string())
    /// );
    /// assert!(matches!(
    ///     SignupIdentifier::parse("pat@example.com").unwrap(),
    ///     SignupIdentifier::Email(_)
    /// ));
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::Required {
                field: "Email or phone",
            });
        }

        if raw.chars().all(|c| c.is_ascii_digit()) {
            let digits = raw.trim_start_matches('0');
            if digits.is_empty() {
                return Err(ValidationError::InvalidPhone);
            }
            return Ok(Self::Phone(format!("+{digits}")));
        }

        Ok(Self::Email(Email::parse(raw)?))
    }

    /// Email address, if the identifier is one.
    #[must_use]
    pub const fn email(&self) -> Option<&Email> {
        match self {
            Self::Email(email) => Some(email),
            Self::Phone(_) => None,
        }
    }
}

impl fmt::Display for SignupIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(email) => write!(f, "{email}"),
            Self::Phone(phone) => write!(f, "{phone}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_become_phone() {
        assert_eq!(
            SignupIdentifier::parse(" 5551234567 ").unwrap(),
            SignupIdentifier::Phone("+5551234567".to_string())
        );
    }

    #[test]
    fn test_all_zero_phone_rejected() {
        assert_eq!(
            SignupIdentifier::parse("0000"),
            Err(ValidationError::InvalidPhone)
        );
    }

    #[test]
    fn test_mixed_input_is_email() {
        let id = SignupIdentifier::parse("Pat@Example.com").unwrap();
        assert_eq!(id.email().map(Email::as_str), Some("pat@example.com"));
        assert!(SignupIdentifier::parse("555-1234").is_err());
    }

    #[test]
    fn test_blank_rejected() {
        assert!(matches!(
            SignupIdentifier::parse(""),
            Err(ValidationError::Required { .. })
        ));
    }
}
