//! Jack Machine Core - Shared domain types.
//!
//! This crate provides the types used by every Jack Machine component:
//! - `portal` - Public site, user portal and admin console
//! - `cli` - Operator tooling (admin roles, catalog seeding)
//!
//! # Architecture
//!
//! The core crate contains only types, validation and pure functions - no I/O,
//! no HTTP clients. Rows are fetched and written by the portal's data-service
//! client; this crate describes what those rows look like and which form input
//! is acceptable before anything is sent.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email addresses and status enums
//! - [`models`] - Table rows and their validated insert payloads
//! - [`search`] - Case-insensitive filtering of fetched rows
//! - [`signup`] - Email-or-phone sign-up identifier
//! - [`validation`] - Form validation errors and helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod search;
pub mod signup;
pub mod types;
pub mod validation;

pub use models::*;
pub use search::{Searchable, filter_by_query};
pub use signup::SignupIdentifier;
pub use types::*;
pub use validation::ValidationError;
