//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! routes.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, route compilation)
//!     → AppConfig (validated, immutable)
//!     → Router::from_config → shared via Arc
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → Router::from_config builds a new router
//!     → atomic swap of the dispatch table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AppConfig, ListenerConfig, LogFormat, ObservabilityConfig, PlaceholderConfig, RouteConfig,
    RouterConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::RouterWatcher;
