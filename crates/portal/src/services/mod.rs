//! Business logic between the routes and the data service.
//!
//! - [`applications`] - Job application submission (resume upload + insert)
//! - [`auth`] - Session identity, role resolution, PKCE
//! - [`catalog`] - Cached public reads of services and job listings
//! - [`notifications`] - Live contact-message feed for the admin dashboard

pub mod applications;
pub mod auth;
pub mod catalog;
pub mod notifications;

pub use catalog::Catalog;
pub use notifications::NotificationHub;
