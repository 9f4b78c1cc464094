//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route (routing):
//!     → access_control.rs (RouteAuthenticator: approve or nominate substitute)
//!     → roles.rs (user roles, expanded through the role hierarchy)
//!     → Back to routing: Approved / Redirect / Fatal
//! ```
//!
//! # Design Decisions
//! - Fail closed: no user or no session means no access to protected routes
//! - Revisiting a violating route aborts the request, never loops
//! - Policies are pluggable through the RouteAuthenticator trait

pub mod access_control;
pub mod roles;

pub use access_control::{RoleAuthenticator, RouteAuthenticator};
pub use roles::{RoleHierarchy, SessionUser, User};
