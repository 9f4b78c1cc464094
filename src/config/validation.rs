//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every route so bad patterns and placeholders surface at load time
//! - Check referential integrity (redirect targets name existing routes)
//! - Validate listener and metrics addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::routing::RoutingError;

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("routes[{0}]: route id must not be empty")]
    EmptyRouteId(usize),

    #[error("routes[{index}]: {source}")]
    Route {
        index: usize,
        #[source]
        source: RoutingError,
    },

    #[error("route '{route}' redirects to unknown route '{target}'")]
    UnknownRedirectTarget { route: String, target: String },

    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("router.locales must not contain empty entries")]
    EmptyLocale,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.router.locales.iter().any(|l| l.trim().is_empty()) {
        errors.push(ValidationError::EmptyLocale);
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.id.is_empty() {
            errors.push(ValidationError::EmptyRouteId(index));
            continue;
        }
        if !seen.insert(route.id.as_str()) {
            errors.push(ValidationError::Route {
                index,
                source: RoutingError::DuplicateRouteId(route.id.clone()),
            });
        }
        if let Err(source) = route.build_route() {
            errors.push(ValidationError::Route { index, source });
        }
    }

    for route in &config.routes {
        if let Some(target) = &route.redirect {
            if !seen.contains(target.as_str()) {
                errors.push(ValidationError::UnknownRedirectTarget {
                    route: route.id.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> AppConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = parse(
            r#"
            [[routes]]
            id = "default"

            [[routes]]
            id = "user"
            path = "user/{id}"
            "#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let config = parse(
            r#"
            [listener]
            bind_address = "not-an-address"

            [[routes]]
            id = ""

            [[routes]]
            id = "user"
            methods = ["FETCH"]

            [[routes]]
            id = "user"

            [[routes]]
            id = "admin"
            auth = "admin"
            redirect = "login"
            "#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(matches!(errors[0], ValidationError::InvalidAddress { field: "listener.bind_address", .. }));
        assert!(matches!(errors[1], ValidationError::EmptyRouteId(1)));
        assert!(matches!(
            errors[2],
            ValidationError::Route { index: 2, source: RoutingError::InvalidAllowedMethod { .. } }
        ));
        assert!(matches!(
            errors[3],
            ValidationError::Route { index: 3, source: RoutingError::DuplicateRouteId(_) }
        ));
        assert!(matches!(errors[4], ValidationError::UnknownRedirectTarget { .. }));
    }

    #[test]
    fn test_invalid_match_expression() {
        let config = parse(
            r#"
            [[routes]]
            id = "broken"
            match = "user/(["
            "#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::Route { source: RoutingError::InvalidMatchExpression { .. }, .. }
        ));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = parse(
            r#"
            [observability]
            metrics_address = "nowhere"
            "#,
        );
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
