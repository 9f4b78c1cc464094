//! Route access control.
//! Decides whether a user may use a route and where to go when not.

use std::fmt;
use std::sync::Arc;

use crate::routing::{RequestContext, Route, Router, RoutingError};
use crate::security::roles::{RoleHierarchy, User};

/// Policy consulted by the [`Router`] for routes that require a role.
pub trait RouteAuthenticator: Send + Sync + fmt::Debug {
    /// Returns true if `user` may use `route`.
    fn authenticate(&self, route: &Route, user: Option<&dyn User>, ctx: &mut RequestContext)
        -> bool;

    /// Pick the route to use after `route` denied access.
    ///
    /// Must fail with [`RoutingError::CircularRedirect`] when `route` already
    /// violated during this resolution.
    fn handle_violation(
        &self,
        route: &Arc<Route>,
        router: &Router,
        ctx: &mut RequestContext,
    ) -> Result<Arc<Route>, RoutingError>;
}

/// Default policy: the user needs the route's role, directly or through the
/// role hierarchy. Violations redirect to the route's redirect target.
#[derive(Debug, Clone, Default)]
pub struct RoleAuthenticator {
    hierarchy: Option<RoleHierarchy>,
}

impl RoleAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hierarchy(hierarchy: RoleHierarchy) -> Self {
        Self {
            hierarchy: Some(hierarchy).filter(|h| !h.is_empty()),
        }
    }
}

impl RouteAuthenticator for RoleAuthenticator {
    fn authenticate(
        &self,
        route: &Route,
        user: Option<&dyn User>,
        ctx: &mut RequestContext,
    ) -> bool {
        let Some(user) = user.filter(|u| u.is_authenticated()) else {
            return false;
        };
        let Some(required) = route.auth() else {
            return true;
        };

        let granted = match &self.hierarchy {
            Some(hierarchy) => hierarchy.expand(user.roles()).contains(required),
            None => user.roles().iter().any(|role| role == required),
        };

        if granted {
            ctx.clear_violations();
        }
        granted
    }

    fn handle_violation(
        &self,
        route: &Arc<Route>,
        router: &Router,
        ctx: &mut RequestContext,
    ) -> Result<Arc<Route>, RoutingError> {
        if ctx.has_violated(route.id()) {
            return Err(RoutingError::CircularRedirect(route.id().to_string()));
        }
        ctx.record_violation(route.id());

        let target = route
            .redirect_target()
            .ok_or_else(|| RoutingError::NoRedirectConfigured(route.id().to_string()))?;

        router
            .get_route(target)
            .cloned()
            .ok_or_else(|| RoutingError::UnknownRedirectTarget {
                route: route.id().to_string(),
                target: target.to_string(),
            })
    }
}
