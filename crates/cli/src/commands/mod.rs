//! Subcommand implementations.

pub mod admin;
pub mod check;
pub mod resume;
pub mod seed;

use jack_machine_portal::backend::{BackendError, SupabaseClient};
use jack_machine_portal::config::{ConfigError, SupabaseConfig};
use thiserror::Error;

/// Failure to reach the data service at all.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create Supabase client: {0}")]
    Client(#[from] BackendError),
}

/// Load `.env` and build a client from the Supabase settings.
pub fn connect() -> Result<(SupabaseConfig, SupabaseClient), ConnectError> {
    dotenvy::dotenv().ok();

    let config = SupabaseConfig::from_env()?;
    let client = SupabaseClient::new(&config)?;
    if !client.has_service_role() {
        tracing::warn!("SUPABASE_SERVICE_ROLE_KEY not set; writes may be refused");
    }
    Ok((config, client))
}
