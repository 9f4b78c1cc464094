//! Request routing and dispatch library.
//!
//! Maps an incoming request (method, path info, entry script) to a
//! registered route, extracts its path parameters, enforces role-based
//! access with redirect fallback, and generates URLs back to routes.

pub mod config;
pub mod http;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use routing::{Resolution, Route, Router, RoutingError};
