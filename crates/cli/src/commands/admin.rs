//! Admin role management.
//!
//! The portal treats an account as staff when the auth provider's
//! `app_metadata.role` is `admin` (or the e-mail is on the allowlist). These
//! commands flip that role through the provider's admin API, so they need the
//! service-role key.
//!
//! # Usage
//!
//! ```bash
//! jm-cli admin grant -e staff@jackmachine.example
//! jm-cli admin revoke -e staff@jackmachine.example
//! ```

use jack_machine_core::{Email, UserRole};
use jack_machine_portal::backend::BackendError;
use thiserror::Error;
use tracing::info;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account has that email.
    #[error("No account found with email: {0}")]
    UnknownAccount(String),

    #[error("Data service error: {0}")]
    Backend(#[from] BackendError),
}

/// Grant the admin role.
///
/// # Errors
///
/// Returns an error if the email is invalid, no account matches, or the
/// provider refuses the update.
pub async fn grant(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Admin).await
}

/// Revoke the admin role, leaving a regular user account.
///
/// # Errors
///
/// See [`grant`].
pub async fn revoke(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::User).await
}

async fn set_role(email: &str, role: UserRole) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;
    let (_, client) = connect()?;

    let user = match client.find_user_by_email(email.as_str()).await {
        Ok(user) => user,
        Err(BackendError::NotFound) => {
            return Err(AdminError::UnknownAccount(email.as_str().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    if user.metadata_role() == role {
        info!(email = %email.as_str(), %role, "Account already has this role");
        return Ok(());
    }

    let updated = client.set_role(user.id, role).await?;
    info!(
        user_id = %updated.id,
        email = %email.as_str(),
        role = %updated.metadata_role(),
        "Role updated"
    );
    Ok(())
}
