//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path info, script name)
//!     → router.rs (strip script + locale segments → RequestContext)
//!     → matcher.rs (method filter, full pass, relative pass, tie-break)
//!     → router.rs (authentication loop via RouteAuthenticator)
//!     → Return: Resolution (approved route + parameters) or RoutingError
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → route.rs (parse template, compile match expression)
//!     → router.rs (register, bind URL prefix, validate redirects)
//!     → Freeze as immutable Arc<Router>
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same registry, method and path always match the same route
//! - Request state carried in RequestContext, never on shared objects

pub mod context;
pub mod error;
pub mod matcher;
pub mod pattern;
pub mod request;
pub mod route;
pub mod router;

pub use context::{PathParameters, RequestContext};
pub use error::{ErrorKind, RoutingError};
pub use pattern::{MatchExpression, Placeholder};
pub use request::{RequestInfo, SimpleRequest};
pub use route::{MethodSet, Redirect, Route, RouteBuilder};
pub use router::{AuthStep, Resolution, Router, RouterOptions, DEFAULT_ROUTE_ID};
