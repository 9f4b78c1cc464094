//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the route
//! dispatcher. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::routing::{Placeholder, Route, RouterOptions, RoutingError};
use crate::security::RoleHierarchy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Deployment facts shared by all routes.
    pub router: RouterConfig,

    /// Role hierarchy: role name → roles it implies.
    pub roles: BTreeMap<String, Vec<String>>,

    /// Route definitions, in registration order.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn role_hierarchy(&self) -> RoleHierarchy {
        self.roles
            .iter()
            .fold(RoleHierarchy::new(), |hierarchy, (role, implied)| {
                hierarchy.with_role(role.clone(), implied.iter().cloned())
            })
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Read the session user from `X-Session-User`/`X-Session-Roles`.
    /// Only enable behind a front end that sets these headers.
    pub trust_session_headers: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trust_session_headers: false,
        }
    }
}

/// Router-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Entry point script the HTTP layer reports for every request.
    pub script_name: String,

    /// A front end rewrites URLs so the script name is hidden.
    pub server_side_rewrite: bool,

    /// Path segment placed before the script name in generated URLs.
    pub relative_assets_path: String,

    /// Recognised locale prefixes (e.g. "en", "de").
    pub locales: Vec<String>,

    /// Fall back to the first route when no "default" route exists.
    pub fallback_to_first: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            script_name: "/index.php".to_string(),
            server_side_rewrite: true,
            relative_assets_path: String::new(),
            locales: Vec::new(),
            fallback_to_first: false,
        }
    }
}

impl RouterConfig {
    pub fn options(&self) -> RouterOptions {
        RouterOptions {
            server_side_rewrite: self.server_side_rewrite,
            relative_assets_path: self.relative_assets_path.clone(),
            locales: self.locales.clone(),
            fallback_to_first: self.fallback_to_first,
        }
    }
}

/// One route definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Unique route identifier.
    pub id: String,

    /// Entry point the route is grouped under (default: index.php).
    #[serde(default)]
    pub script: Option<String>,

    /// Path template, e.g. "user/{id}".
    #[serde(default)]
    pub path: String,

    /// Explicit match expression (regex, unanchored).
    #[serde(default, rename = "match")]
    pub match_expression: Option<String>,

    /// Also match as a path suffix.
    #[serde(default)]
    pub relative: bool,

    /// Allowed request methods; empty allows all.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Role required to use the route.
    #[serde(default)]
    pub auth: Option<String>,

    /// Free-form string handed to the application for finer checks.
    #[serde(default)]
    pub auth_parameters: Option<String>,

    /// Route id to use when access is denied.
    #[serde(default)]
    pub redirect: Option<String>,

    /// Controller reference resolved by the dispatch layer.
    #[serde(default)]
    pub controller: Option<String>,

    /// Controller method name.
    #[serde(default)]
    pub method: Option<String>,

    /// Placeholder declarations, in capture group order.
    #[serde(default)]
    pub placeholders: Vec<PlaceholderConfig>,
}

/// Placeholder declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaceholderConfig {
    pub name: String,

    /// Match pattern (default: `[^/]+`).
    #[serde(default, rename = "match")]
    pub pattern: Option<String>,

    #[serde(default)]
    pub default: Option<String>,
}

impl RouteConfig {
    /// Compile this definition into a [`Route`].
    pub fn build_route(&self) -> Result<Route, RoutingError> {
        let mut builder = Route::builder(self.id.clone())
            .path(self.path.clone())
            .relative(self.relative)
            .methods(self.methods.iter().cloned());

        if let Some(script) = &self.script {
            builder = builder.script(script.clone());
        }
        if let Some(expr) = &self.match_expression {
            builder = builder.match_expression(expr.clone());
        }
        if let Some(role) = &self.auth {
            builder = builder.auth(role.clone());
        }
        if let Some(params) = &self.auth_parameters {
            builder = builder.auth_parameters(params.clone());
        }
        if let Some(target) = &self.redirect {
            builder = builder.redirect(target.clone());
        }
        if let Some(controller) = &self.controller {
            builder = builder.controller(controller.clone(), self.method.clone());
        }

        for declared in &self.placeholders {
            let mut placeholder = Placeholder::new(declared.name.clone());
            if let Some(pattern) = &declared.pattern {
                placeholder = placeholder.with_pattern(pattern.clone());
            }
            if let Some(default) = &declared.default {
                placeholder = placeholder.with_default(default.clone());
            }
            builder = builder.placeholder(placeholder);
        }

        builder.build()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
