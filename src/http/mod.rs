//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + session layers)
//!     → request.rs (HttpRequest: method, path info, host, scheme)
//!     → routing::Router (match + authenticate)
//!     → response.rs (redirect, or error status)
//!     → dispatch.rs (controller bound to the approved route)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::{echo, Controller, DispatchError, DispatchTable, HandlerRegistry};
pub use request::{HttpRequest, RequestError};
pub use server::{AppState, HttpServer};
