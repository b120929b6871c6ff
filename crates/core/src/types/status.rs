//! Status and classification enums stored as text in the external data service.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a stored enum value is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    /// What was being parsed (e.g. "application status").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Review state of a job application.
///
/// Values are written in lowercase. Older rows written with a capitalized
/// spelling (`"Pending"`) parse to the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Shortlisted,
    Rejected,
    Approved,
}

impl ApplicationStatus {
    /// Every status, in the order the admin action menu lists them.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Shortlisted,
        Self::Rejected,
        Self::Approved,
    ];

    /// Canonical stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Shortlisted => "shortlisted",
            Self::Rejected => "rejected",
            Self::Approved => "approved",
        }
    }

    /// Label shown to staff.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Shortlisted => "Shortlisted",
            Self::Rejected => "Rejected",
            Self::Approved => "Approved",
        }
    }

    /// Label shown to the applicant on their results page.
    #[must_use]
    pub const fn applicant_label(self) -> &'static str {
        match self {
            Self::Pending => "Under Review",
            other => other.label(),
        }
    }

    /// CSS class for the status badge.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Pending => "badge badge-yellow",
            Self::Shortlisted => "badge badge-blue",
            Self::Rejected => "badge badge-red",
            Self::Approved => "badge badge-green",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "application status",
                value: s.to_string(),
            })
    }
}

impl Serialize for ApplicationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApplicationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Portal role resolved from the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Route a freshly signed-in account lands on.
    #[must_use]
    pub const fn landing_path(self) -> &'static str {
        match self {
            Self::User => "/users/dashboard",
            Self::Admin => "/admin/dashboard",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownVariant {
                kind: "user role",
                value: s.to_string(),
            }),
        }
    }
}

/// Icon displayed on a service card.
///
/// Deserializing an unrecognized key is an error. Rows without an icon column
/// use [`ServiceIcon::Wrench`] via `#[serde(default)]` on the owning field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceIcon {
    #[default]
    Wrench,
    Truck,
    Shield,
    Gear,
    Oil,
    Gauge,
    Training,
    Crane,
    Lightbulb,
}

impl ServiceIcon {
    /// Every icon, in picker order.
    pub const ALL: [Self; 9] = [
        Self::Wrench,
        Self::Truck,
        Self::Shield,
        Self::Gear,
        Self::Oil,
        Self::Gauge,
        Self::Training,
        Self::Crane,
        Self::Lightbulb,
    ];

    /// Stored key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wrench => "wrench",
            Self::Truck => "truck",
            Self::Shield => "shield",
            Self::Gear => "gear",
            Self::Oil => "oil",
            Self::Gauge => "gauge",
            Self::Training => "training",
            Self::Crane => "crane",
            Self::Lightbulb => "lightbulb",
        }
    }

    /// Glyph rendered on the card.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Wrench => "🔧",
            Self::Truck => "🚛",
            Self::Shield => "🛡️",
            Self::Gear => "⚙️",
            Self::Oil => "🛢️",
            Self::Gauge => "📊",
            Self::Training => "🎓",
            Self::Crane => "🏗️",
            Self::Lightbulb => "💡",
        }
    }
}

impl FromStr for ServiceIcon {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|icon| icon.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "service icon",
                value: s.to_string(),
            })
    }
}

/// Kind of entry in the admin activity log.
///
/// The log is written by the data service, so unrecognized kinds are kept
/// verbatim in [`ActivityKind::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Application,
    Message,
    Service,
    Career,
    Account,
    Other(String),
}

impl ActivityKind {
    /// Glyph for the activity feed.
    #[must_use]
    pub const fn glyph(&self) -> &'static str {
        match self {
            Self::Application => "📄",
            Self::Message => "✉️",
            Self::Service => "🔧",
            Self::Career => "💼",
            Self::Account => "👤",
            Self::Other(_) => "•",
        }
    }

    /// Stored value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Application => "application",
            Self::Message => "message",
            Self::Service => "service",
            Self::Career => "career",
            Self::Account => "account",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for ActivityKind {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "application" | "new_application" => Self::Application,
            "message" | "new_message" => Self::Message,
            "service" => Self::Service,
            "career" | "job" => Self::Career,
            "account" | "signup" | "user" => Self::Account,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl Serialize for ActivityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_any_case() {
        assert_eq!(
            "Pending".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::Pending
        );
        assert_eq!(
            "SHORTLISTED".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::Shortlisted
        );
        assert!("hired".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ApplicationStatus::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");
        let back: ApplicationStatus = serde_json::from_str("\"Rejected\"").unwrap();
        assert_eq!(back, ApplicationStatus::Rejected);
    }

    #[test]
    fn test_applicant_label_hides_pending() {
        assert_eq!(ApplicationStatus::Pending.applicant_label(), "Under Review");
        assert_eq!(ApplicationStatus::Approved.applicant_label(), "Approved");
    }

    #[test]
    fn test_service_icon_rejects_unknown_key() {
        let err = serde_json::from_str::<ServiceIcon>("\"rocket\"");
        assert!(err.is_err());
        let icon: ServiceIcon = serde_json::from_str("\"crane\"").unwrap();
        assert_eq!(icon.glyph(), "🏗️");
    }

    #[test]
    fn test_activity_kind_keeps_unknown() {
        let kind: ActivityKind = serde_json::from_str("\"invoice_paid\"").unwrap();
        assert_eq!(kind, ActivityKind::Other("invoice_paid".to_string()));
        assert_eq!(kind.glyph(), "•");
        assert_eq!(ActivityKind::from("New_Application"), ActivityKind::Application);
    }

    #[test]
    fn test_role_landing_path() {
        assert_eq!(UserRole::Admin.landing_path(), "/admin/dashboard");
        assert_eq!("user".parse::<UserRole>().unwrap(), UserRole::User);
    }
}
