//! HTTP middleware stack for the portal.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, one transaction per request)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (recorded in the span and the Sentry scope)
//! 4. Security headers (CSP, frame, referrer, permissions policies)
//! 5. Session layer (tower-sessions with the in-memory store)
//!
//! Authentication is not a layer: handlers declare it through the
//! [`RequireUser`], [`RequireAdmin`] and [`OptionalUser`] extractors.

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalUser, RequireAdmin, RequireUser, clear_auth_context, set_auth_context};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
