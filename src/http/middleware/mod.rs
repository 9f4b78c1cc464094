//! Request middleware.

pub mod session;

pub use session::{session_from_headers, session_middleware, X_SESSION_ROLES, X_SESSION_USER};
