//! Row types for the tables the portal reads and writes.
//!
//! Each entity comes in two shapes: the row as returned by the data service
//! (`Service`, `JobListing`, ...) and the validated insert payload built from
//! a submitted form (`NewService`, `NewJobListing`, ...).

pub mod activity;
pub mod application;
pub mod job;
pub mod message;
pub mod service;

pub use activity::Activity;
pub use application::{Application, ApplicationForm, ApplicantDetails, NewApplication};
pub use job::{JobForm, JobListing, NewJobListing};
pub use message::{ContactForm, NewMessage, UserMessage};
pub use service::{NewService, Service, ServiceForm};

use serde::{Deserialize, Deserializer};

/// Deserialize a nullable column, substituting the type's default for `null`.
///
/// Pair with `#[serde(default)]` so a missing column behaves the same way.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
