//! Routing error definitions.

use thiserror::Error;

/// Broad classification of a [`RoutingError`].
///
/// The dispatch layer uses this to decide how loudly to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised while building the registry. The application should refuse to start.
    Configuration,
    /// No route applies to the request. Recoverable by the caller.
    NotFound,
    /// A configuration defect that only shows up while serving a request.
    Fatal,
    /// The caller used the API incorrectly (missing parameter, unknown id).
    Usage,
}

/// Errors produced while building, matching or authenticating routes.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A route with this id is already registered.
    #[error("route '{0}' is already registered")]
    DuplicateRouteId(String),

    /// A route declares a request method that is not supported.
    #[error("route '{route}' declares unsupported request method '{method}'")]
    InvalidAllowedMethod { route: String, method: String },

    /// The path template references a placeholder that has no declaration.
    #[error("route '{route}' references undeclared placeholder '{placeholder}'")]
    MissingPlaceholderDeclaration { route: String, placeholder: String },

    /// The match expression could not be compiled.
    #[error("route '{route}' has an invalid match expression: {source}")]
    InvalidMatchExpression {
        route: String,
        #[source]
        source: regex::Error,
    },

    /// A redirect target names a route that does not exist.
    #[error("route '{route}' redirects to unknown route '{target}'")]
    UnknownRedirectTarget { route: String, target: String },

    /// No route matched and no fallback route is available.
    #[error("no route matches {method} '{path}'")]
    RouteNotFound { method: String, path: String },

    /// Authentication failures redirected back to an already visited route.
    #[error("circular redirect detected at route '{0}'")]
    CircularRedirect(String),

    /// Authentication failed on a route without a redirect target.
    #[error("route '{0}' denied access but has no redirect configured")]
    NoRedirectConfigured(String),

    /// Path generation needs a value that was neither passed, extracted nor defaulted.
    #[error("route '{route}' is missing a value for path parameter '{placeholder}'")]
    MissingPathParameter { route: String, placeholder: String },

    /// Lookup of a route id that is not registered.
    #[error("route '{0}' is not registered")]
    UnknownRoute(String),
}

impl RoutingError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoutingError::DuplicateRouteId(_)
            | RoutingError::InvalidAllowedMethod { .. }
            | RoutingError::MissingPlaceholderDeclaration { .. }
            | RoutingError::InvalidMatchExpression { .. } => ErrorKind::Configuration,
            // Caught at validation time normally; at request time it is a defect.
            RoutingError::UnknownRedirectTarget { .. } => ErrorKind::Fatal,
            RoutingError::RouteNotFound { .. } => ErrorKind::NotFound,
            RoutingError::CircularRedirect(_) | RoutingError::NoRedirectConfigured(_) => {
                ErrorKind::Fatal
            }
            RoutingError::MissingPathParameter { .. } | RoutingError::UnknownRoute(_) => {
                ErrorKind::Usage
            }
        }
    }

    /// Returns true for errors that must abort the current request.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}
