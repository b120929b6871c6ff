//! Connectivity check.

use jack_machine_portal::backend::DataService;
use jack_machine_portal::db::{JobRepository, ServiceRepository};
use tracing::info;

use super::connect;

/// Ping the data service and report the catalog size.
///
/// # Errors
///
/// Returns an error if configuration is missing or the service does not answer.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (config, client) = connect()?;
    info!(url = %config.url, "Checking data service");

    client.ping().await?;
    info!("Data service reachable");

    let services = ServiceRepository::new(&client).count().await?;
    let jobs = JobRepository::new(&client).count().await?;
    info!(services, jobs, "Catalog rows");
    Ok(())
}
