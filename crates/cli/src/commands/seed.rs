//! Seed the service catalog and job board from a YAML file.
//!
//! Every entry is validated with the same rules the admin console applies
//! before anything is sent, so a bad file writes nothing.
//!
//! ```yaml
//! services:
//!   - name: Hydraulic Repair
//!     category: Field Service
//!     clients: 120
//!     icon: wrench
//! jobs:
//!   - title: Field Technician
//!     location: Rochester, NY
//!     type: Full-time
//!     skills: [Hydraulics, CDL]
//! ```

use std::path::Path;

use jack_machine_core::{NewJobListing, NewService};
use jack_machine_portal::db::{JobRepository, ServiceRepository};
use serde::Deserialize;
use tracing::{error, info};

use super::connect;

/// Contents of a catalog seed file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub services: Vec<NewService>,
    #[serde(default)]
    pub jobs: Vec<NewJobListing>,
}

impl CatalogFile {
    /// Validate every entry, collecting all failures.
    ///
    /// Returns the normalized catalog, or one message per invalid entry.
    pub fn validated(self) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        let services: Vec<NewService> = self
            .services
            .into_iter()
            .enumerate()
            .filter_map(|(i, s)| {
                s.validated()
                    .map_err(|e| errors.push(format!("services[{i}]: {e}")))
                    .ok()
            })
            .collect();
        let jobs: Vec<NewJobListing> = self
            .jobs
            .into_iter()
            .enumerate()
            .filter_map(|(i, j)| {
                j.validated()
                    .map_err(|e| errors.push(format!("jobs[{i}]: {e}")))
                    .ok()
            })
            .collect();

        if errors.is_empty() {
            Ok(Self { services, jobs })
        } else {
            Err(errors)
        }
    }
}

/// Insert the services and jobs listed in `file_path`.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed, any entry fails
/// validation, or an insert is refused.
pub async fn catalog(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting
    let content = tokio::fs::read_to_string(path).await?;
    let parsed: CatalogFile = serde_yaml::from_str(&content)?;

    let catalog = match parsed.validated() {
        Ok(catalog) => catalog,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    info!(
        services = catalog.services.len(),
        jobs = catalog.jobs.len(),
        "Catalog validated successfully"
    );

    if dry_run {
        info!("Dry run; nothing written");
        return Ok(());
    }

    let (_, client) = connect()?;

    let services = ServiceRepository::new(&client);
    for service in &catalog.services {
        let created = services.create(service).await?;
        info!(service_id = %created.id, name = %created.name, "Service created");
    }

    let jobs = JobRepository::new(&client);
    for job in &catalog.jobs {
        let created = jobs.create(job).await?;
        info!(job_id = %created.id, title = %created.title, "Job listing created");
    }

    info!(
        services = catalog.services.len(),
        jobs = catalog.jobs.len(),
        "Seeding complete"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jack_machine_core::ServiceIcon;

    const SAMPLE: &str = r"
services:
  - name: '  Hydraulic Repair '
    category: Field Service
    clients: 120
    icon: crane
jobs:
  - title: Field Technician
    type: Full-time
    skills: [Hydraulics, ' ', CDL]
";

    #[test]
    fn test_parse_and_validate_catalog() {
        let catalog: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        let catalog = catalog.validated().unwrap();

        assert_eq!(catalog.services.len(), 1);
        assert_eq!(catalog.services[0].name, "Hydraulic Repair");
        assert_eq!(catalog.services[0].icon, ServiceIcon::Crane);
        assert_eq!(catalog.jobs[0].employment_type, "Full-time");
        assert_eq!(catalog.jobs[0].skills, vec!["Hydraulics", "CDL"]);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let catalog: CatalogFile = serde_yaml::from_str("jobs: []").unwrap();
        assert!(catalog.services.is_empty());
        assert!(catalog.validated().unwrap().jobs.is_empty());
    }

    #[test]
    fn test_every_invalid_entry_is_reported() {
        let yaml = r"
services:
  - name: ''
  - name: Ok
    clients: -3
jobs:
  - title: '   '
";
        let catalog: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        let errors = catalog.validated().unwrap_err();

        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("services[0]"));
        assert!(errors[1].starts_with("services[1]"));
        assert!(errors[2].starts_with("jobs[0]"));
    }

    #[test]
    fn test_unknown_icon_is_a_parse_error() {
        let yaml = "services:\n  - name: Paint\n    icon: rocket\n";
        assert!(serde_yaml::from_str::<CatalogFile>(yaml).is_err());
    }
}
