//! Portal-side models that are not table rows.

pub mod session;

pub use session::{AuthContext, SessionUser, keys as session_keys};
