//! Repair services offered on the public site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;
use crate::types::{ServiceIcon, ServiceId};
use crate::validation::{self, ValidationError};

/// A row of the `services` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Number of clients served, shown as social proof.
    #[serde(default, deserialize_with = "null_as_default")]
    pub clients: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: ServiceIcon,
    pub created_at: DateTime<Utc>,
}

/// Insert/update payload for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewService {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub clients: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub icon: ServiceIcon,
}

impl NewService {
    /// Normalize whitespace and enforce the non-empty name rule.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the name is blank or a field is too long.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let name = validation::required("Service name", &self.name)?;
        validation::max_len("Service name", &name, 120)?;
        let category = self.category.trim().to_string();
        validation::max_len("Category", &category, 80)?;
        if self.clients < 0 {
            return Err(ValidationError::NotANumber { field: "Clients" });
        }
        Ok(Self {
            name,
            category,
            description: self.description.trim().to_string(),
            clients: self.clients,
            image_url: validation::optional(self.image_url.as_deref()),
            icon: self.icon,
        })
    }
}

/// The admin service editor as submitted by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub clients: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub icon: String,
}

impl ServiceForm {
    /// Parse the text fields into a validated [`NewService`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a blank name, a non-numeric client
    /// count, or an icon key outside [`ServiceIcon::ALL`].
    pub fn validate(&self) -> Result<NewService, ValidationError> {
        let clients = match self.clients.trim() {
            "" => 0,
            raw => raw
                .parse::<i64>()
                .map_err(|_| ValidationError::NotANumber { field: "Clients" })?,
        };
        let icon = match self.icon.trim() {
            "" => ServiceIcon::default(),
            raw => raw
                .parse::<ServiceIcon>()
                .map_err(|_| ValidationError::Unrecognized { field: "Icon" })?,
        };
        NewService {
            name: self.name.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            clients,
            image_url: Some(self.image_url.clone()),
            icon,
        }
        .validated()
    }

    /// Prefill the editor from an existing row.
    #[must_use]
    pub fn from_service(service: &Service) -> Self {
        Self {
            name: service.name.clone(),
            category: service.category.clone(),
            description: service.description.clone(),
            clients: service.clients.to_string(),
            image_url: service.image_url.clone().unwrap_or_default(),
            icon: service.icon.as_str().to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_row_tolerates_nulls() {
        let service: Service = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Hydraulic Jack Repair",
            "category": null,
            "description": null,
            "clients": null,
            "image_url": null,
            "created_at": "2024-05-01T10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(service.clients, 0);
        assert_eq!(service.icon, ServiceIcon::Wrench);
        assert!(service.category.is_empty());
    }

    #[test]
    fn test_row_rejects_unknown_icon() {
        let result = serde_json::from_value::<Service>(serde_json::json!({
            "id": 3,
            "name": "Hydraulic Jack Repair",
            "icon": "rocket",
            "created_at": "2024-05-01T10:00:00+00:00"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_form_requires_name() {
        let form = ServiceForm {
            name: "   ".to_string(),
            ..ServiceForm::default()
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::Required {
                field: "Service name"
            })
        );
    }

    #[test]
    fn test_form_parses_fields() {
        let form = ServiceForm {
            name: " Fleet Maintenance ".to_string(),
            category: "Maintenance".to_string(),
            clients: "42".to_string(),
            icon: "truck".to_string(),
            ..ServiceForm::default()
        };
        let service = form.validate().unwrap();
        assert_eq!(service.name, "Fleet Maintenance");
        assert_eq!(service.clients, 42);
        assert_eq!(service.icon, ServiceIcon::Truck);
        assert_eq!(service.image_url, None);
    }

    #[test]
    fn test_form_rejects_bad_client_count() {
        let form = ServiceForm {
            name: "Inspection".to_string(),
            clients: "lots".to_string(),
            ..ServiceForm::default()
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::NotANumber { field: "Clients" })
        );
    }
}
