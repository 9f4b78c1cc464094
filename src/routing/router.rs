//! Route registry and request resolution.
//!
//! # Responsibilities
//! - Store routes in registration order, keyed by id
//! - Strip the script and locale segments from the request path
//! - Look up the matching route, or the fallback route
//! - Drive the authentication loop until a route is approved
//!
//! # Design Decisions
//! - Built once at boot, then shared read-only (thread-safe without locks)
//! - Per-request state lives in the returned [`Resolution`]
//! - Explicit `RouteNotFound` when nothing matches and there is no fallback
//! - Redirect loops are bounded by the visited-route check alone

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use axum::http::StatusCode;

use crate::config::AppConfig;

use crate::routing::context::{PathParameters, RequestContext};
use crate::routing::error::RoutingError;
use crate::routing::matcher::find_route;
use crate::routing::request::RequestInfo;
use crate::routing::route::{compose_url_prefix, script_basename, Redirect, Route};
use crate::security::access_control::{RoleAuthenticator, RouteAuthenticator};
use crate::security::roles::User;

/// Id of the conventional fallback route.
pub const DEFAULT_ROUTE_ID: &str = "default";

/// Deployment facts the router needs.
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// A front end rewrites URLs so the script name is not part of the path.
    pub server_side_rewrite: bool,
    /// Path segment placed before the script name when not rewriting.
    pub relative_assets_path: String,
    /// Recognised leading locale segments, compared case-insensitively.
    pub locales: Vec<String>,
    /// Use the first registered route as fallback when there is no `default` route.
    pub fallback_to_first: bool,
}

/// Result of one authentication check.
#[derive(Debug)]
pub enum AuthStep {
    /// The route may be used.
    Approved(Arc<Route>),
    /// Access was denied; continue with the substitute route.
    Redirect(Arc<Route>),
    /// Resolution must stop.
    Fatal(RoutingError),
}

/// The outcome of resolving one request.
#[derive(Debug, Clone)]
pub struct Resolution {
    route: Arc<Route>,
    matched: Arc<Route>,
    redirected_by: Option<Arc<Route>>,
    parameters: PathParameters,
    context: RequestContext,
}

impl Resolution {
    /// The approved route.
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// The route that matched the request before any authentication redirect.
    pub fn matched(&self) -> &Arc<Route> {
        &self.matched
    }

    /// True if access to the matched route was denied and a substitute approved.
    pub fn was_redirected(&self) -> bool {
        self.redirected_by.is_some()
    }

    /// The last route that denied access and handed over to the approved route.
    pub fn redirected_by(&self) -> Option<&Arc<Route>> {
        self.redirected_by.as_ref()
    }

    /// The client redirect for a redirected resolution, `None` otherwise.
    ///
    /// Points at the URL of the approved substitute route, which is the
    /// redirect target of [`Resolution::redirected_by`].
    pub fn redirect(
        &self,
        query: &[(&str, &str)],
        status: StatusCode,
    ) -> Result<Option<Redirect>, RoutingError> {
        if self.redirected_by.is_none() {
            return Ok(None);
        }
        self.route.redirect_here(&self.context, query, status).map(Some)
    }

    /// Path parameters of the approved route.
    pub fn parameters(&self) -> &PathParameters {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name)
    }

    pub fn locale(&self) -> Option<&str> {
        self.context.locale()
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Mutable access, e.g. for extracting parameters of other routes.
    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }

    /// URL of the approved route, reusing this request's parameters.
    pub fn url(&self, params: &[(&str, &str)]) -> Result<String, RoutingError> {
        self.route.url_in(&self.context, params)
    }
}

/// The route registry.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
    index: HashMap<String, usize>,
    options: RouterOptions,
    authenticator: Option<Arc<dyn RouteAuthenticator>>,
    default_authenticator: OnceLock<Arc<dyn RouteAuthenticator>>,
}

impl Router {
    pub fn new(options: RouterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Build a validated router from configuration.
    ///
    /// A configured role hierarchy installs a [`RoleAuthenticator`] that
    /// honours it; otherwise the default policy is created on first use.
    pub fn from_config(config: &AppConfig) -> Result<Self, RoutingError> {
        let mut router = Router::new(config.router.options());
        for route in &config.routes {
            router.add_route(route.build_route()?)?;
        }
        router.validate()?;

        if !config.roles.is_empty() {
            router.set_authenticator(Arc::new(RoleAuthenticator::with_hierarchy(
                config.role_hierarchy(),
            )));
        }

        tracing::info!(routes = router.len(), "Router built");
        Ok(router)
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Register a route. Fails if the id is taken.
    pub fn add_route(&mut self, mut route: Route) -> Result<(), RoutingError> {
        if self.index.contains_key(route.id()) {
            return Err(RoutingError::DuplicateRouteId(route.id().to_string()));
        }

        route.bind_url_prefix(compose_url_prefix(
            route.script_name(),
            self.options.server_side_rewrite,
            &self.options.relative_assets_path,
        ));

        tracing::debug!(route = %route.id(), expression = %route.match_expression().source(), "Route registered");
        self.index.insert(route.id().to_string(), self.routes.len());
        self.routes.push(Arc::new(route));
        Ok(())
    }

    pub fn get_route(&self, id: &str) -> Option<&Arc<Route>> {
        self.index.get(id).map(|&i| &self.routes[i])
    }

    /// Like [`Router::get_route`], failing with `UnknownRoute`.
    pub fn require_route(&self, id: &str) -> Result<&Arc<Route>, RoutingError> {
        self.get_route(id)
            .ok_or_else(|| RoutingError::UnknownRoute(id.to_string()))
    }

    /// Routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Replace the access policy.
    pub fn set_authenticator(&mut self, authenticator: Arc<dyn RouteAuthenticator>) {
        self.authenticator = Some(authenticator);
    }

    /// The configured policy, or a [`RoleAuthenticator`] created on first use.
    pub fn authenticator(&self) -> &Arc<dyn RouteAuthenticator> {
        match &self.authenticator {
            Some(authenticator) => authenticator,
            None => self
                .default_authenticator
                .get_or_init(|| Arc::new(RoleAuthenticator::new()) as Arc<dyn RouteAuthenticator>),
        }
    }

    /// The route used when nothing else matches.
    pub fn fallback(&self) -> Option<&Arc<Route>> {
        self.get_route(DEFAULT_ROUTE_ID).or_else(|| {
            if self.options.fallback_to_first {
                self.routes.first()
            } else {
                None
            }
        })
    }

    /// Check that every redirect target is registered.
    pub fn validate(&self) -> Result<(), RoutingError> {
        for route in &self.routes {
            if let Some(target) = route.redirect_target() {
                if self.get_route(target).is_none() {
                    return Err(RoutingError::UnknownRedirectTarget {
                        route: route.id().to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Create the request context, stripping script and locale segments.
    pub fn context_for<R: RequestInfo + ?Sized>(&self, request: &R) -> RequestContext {
        let mut ctx = RequestContext::new(
            request.method().clone(),
            request.path_info(),
            request.script_name(),
        )
        .with_host(request.host().map(str::to_string), request.is_secure());

        let trimmed = request.path_info().trim_matches('/');
        let mut segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        if self.options.server_side_rewrite {
            let basename = script_basename(request.script_name());
            if !basename.is_empty() && segments.first() == Some(&basename) {
                segments.remove(0);
            }
        }

        if let Some(first) = segments.first() {
            if let Some(locale) = self
                .options
                .locales
                .iter()
                .find(|locale| locale.eq_ignore_ascii_case(first))
            {
                ctx.set_locale(locale.clone());
                segments.remove(0);
            }
        }

        ctx.set_checked_path(segments.join("/"));
        ctx
    }

    /// Resolve a request to an approved route.
    pub fn get_route_from_path_info<R: RequestInfo + ?Sized>(
        &self,
        request: &R,
        user: Option<&dyn User>,
    ) -> Result<Resolution, RoutingError> {
        let mut ctx = self.context_for(request);

        let matched = find_route(&self.routes, self.fallback(), ctx.method(), ctx.checked_path())
            .cloned()
            .ok_or_else(|| RoutingError::RouteNotFound {
                method: ctx.method().to_string(),
                path: ctx.path_info().to_string(),
            })?;

        tracing::debug!(
            method = %ctx.method(),
            path = %ctx.checked_path(),
            route = %matched.id(),
            "Route matched"
        );

        let (route, redirected_by) = self.authorize(Arc::clone(&matched), user, &mut ctx)?;
        let parameters = route.parameters(&mut ctx).clone();

        Ok(Resolution {
            route,
            matched,
            redirected_by,
            parameters,
            context: ctx,
        })
    }

    /// Run the authentication loop starting at `route`.
    ///
    /// Returns the approved route and the last route that redirected to it.
    fn authorize(
        &self,
        mut route: Arc<Route>,
        user: Option<&dyn User>,
        ctx: &mut RequestContext,
    ) -> Result<(Arc<Route>, Option<Arc<Route>>), RoutingError> {
        let mut redirected_by = None;
        loop {
            match self.check(&route, user, ctx) {
                AuthStep::Approved(approved) => {
                    ctx.clear_violations();
                    return Ok((approved, redirected_by));
                }
                AuthStep::Redirect(substitute) => {
                    tracing::warn!(
                        route = %route.id(),
                        substitute = %substitute.id(),
                        "Access denied, redirecting"
                    );
                    redirected_by = Some(std::mem::replace(&mut route, substitute));
                }
                AuthStep::Fatal(err) => {
                    tracing::error!(route = %route.id(), error = %err, "Route resolution aborted");
                    return Err(err);
                }
            }
        }
    }

    /// One authentication check of `route`.
    pub fn check(
        &self,
        route: &Arc<Route>,
        user: Option<&dyn User>,
        ctx: &mut RequestContext,
    ) -> AuthStep {
        if route.auth().is_none() {
            return AuthStep::Approved(Arc::clone(route));
        }

        let authenticator = self.authenticator();
        if authenticator.authenticate(route, user, ctx) {
            return AuthStep::Approved(Arc::clone(route));
        }

        match authenticator.handle_violation(route, self, ctx) {
            Ok(substitute) => AuthStep::Redirect(substitute),
            Err(err) => AuthStep::Fatal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::request::SimpleRequest;
    use crate::routing::pattern::Placeholder;
    use crate::security::roles::SessionUser;
    use axum::http::Method;

    fn router_with(options: RouterOptions, routes: Vec<Route>) -> Router {
        let mut router = Router::new(options);
        for route in routes {
            router.add_route(route).unwrap();
        }
        router
    }

    fn resolve(router: &Router, path: &str) -> Result<Resolution, RoutingError> {
        router.get_route_from_path_info(&SimpleRequest::get(path), None)
    }

    #[test]
    fn test_duplicate_route_id() {
        let mut router = Router::new(RouterOptions::default());
        router.add_route(Route::builder("about").build().unwrap()).unwrap();
        let err = router
            .add_route(Route::builder("about").path("other").build().unwrap())
            .unwrap_err();
        assert!(matches!(err, RoutingError::DuplicateRouteId(ref id) if id == "about"));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_default_and_about() {
        let router = router_with(
            RouterOptions::default(),
            vec![
                Route::builder("default").build().unwrap(),
                Route::builder("about").path("about").build().unwrap(),
            ],
        );
        assert_eq!(resolve(&router, "").unwrap().route().id(), "default");
        assert_eq!(resolve(&router, "/about").unwrap().route().id(), "about");
        assert_eq!(resolve(&router, "/about/").unwrap().route().id(), "about");
    }

    #[test]
    fn test_placeholder_extraction_and_not_found() {
        let router = router_with(
            RouterOptions::default(),
            vec![Route::builder("user")
                .path("user/{id}")
                .placeholder(Placeholder::new("id"))
                .build()
                .unwrap()],
        );

        let resolution = resolve(&router, "/user/42").unwrap();
        assert_eq!(resolution.route().id(), "user");
        assert_eq!(resolution.parameter("id"), Some("42"));

        let err = resolve(&router, "/user").unwrap_err();
        assert!(matches!(err, RoutingError::RouteNotFound { .. }));
    }

    #[test]
    fn test_fallback_to_first() {
        let options = RouterOptions {
            fallback_to_first: true,
            ..RouterOptions::default()
        };
        let router = router_with(
            options,
            vec![
                Route::builder("home").path("home").build().unwrap(),
                Route::builder("about").path("about").build().unwrap(),
            ],
        );
        assert_eq!(resolve(&router, "/missing").unwrap().route().id(), "home");
    }

    #[test]
    fn test_script_segment_stripped_when_rewriting() {
        let options = RouterOptions {
            server_side_rewrite: true,
            ..RouterOptions::default()
        };
        let router = router_with(
            options,
            vec![Route::builder("users")
                .script("admin.php")
                .path("users")
                .build()
                .unwrap()],
        );
        let request = SimpleRequest::get("/admin/users").with_script("/admin.php");
        let resolution = router.get_route_from_path_info(&request, None).unwrap();
        assert_eq!(resolution.route().id(), "users");
        assert_eq!(resolution.url(&[]).unwrap(), "/admin/users");
    }

    #[test]
    fn test_locale_prefix_stripped() {
        let options = RouterOptions {
            locales: vec!["en".into(), "de".into()],
            ..RouterOptions::default()
        };
        let router = router_with(
            options,
            vec![Route::builder("about").path("about").build().unwrap()],
        );

        let resolution = resolve(&router, "/DE/about").unwrap();
        assert_eq!(resolution.route().id(), "about");
        assert_eq!(resolution.locale(), Some("de"));

        let resolution = resolve(&router, "/about").unwrap();
        assert_eq!(resolution.locale(), None);
    }

    #[test]
    fn test_method_restriction() {
        let router = router_with(
            RouterOptions::default(),
            vec![Route::builder("save").path("save").methods(["POST"]).build().unwrap()],
        );
        let post = SimpleRequest::new(Method::POST, "/save");
        assert!(router.get_route_from_path_info(&post, None).is_ok());
        assert!(matches!(
            resolve(&router, "/save"),
            Err(RoutingError::RouteNotFound { .. })
        ));
    }

    #[test]
    fn test_self_redirect_is_circular() {
        let router = router_with(
            RouterOptions::default(),
            vec![Route::builder("admin")
                .path("admin")
                .auth("admin")
                .redirect("admin")
                .build()
                .unwrap()],
        );
        let err = resolve(&router, "/admin").unwrap_err();
        assert!(matches!(err, RoutingError::CircularRedirect(ref id) if id == "admin"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_violation_redirects_to_login() {
        let router = router_with(
            RouterOptions::default(),
            vec![
                Route::builder("login").path("login").build().unwrap(),
                Route::builder("admin")
                    .path("admin")
                    .auth("admin")
                    .redirect("login")
                    .build()
                    .unwrap(),
            ],
        );

        let resolution = resolve(&router, "/admin").unwrap();
        assert_eq!(resolution.route().id(), "login");
        assert_eq!(resolution.matched().id(), "admin");
        assert!(resolution.was_redirected());
        assert_eq!(resolution.redirected_by().map(|r| r.id()), Some("admin"));
        assert_eq!(resolution.context().interrupted_path(), Some("/admin"));

        let redirect = resolution.redirect(&[], StatusCode::FOUND).unwrap().unwrap();
        assert_eq!(redirect.location, "/index.php/login");
        assert_eq!(redirect.status, StatusCode::FOUND);

        let admin = SessionUser::authenticated("alice", ["admin"]);
        let resolution = router
            .get_route_from_path_info(&SimpleRequest::get("/admin"), Some(&admin))
            .unwrap();
        assert_eq!(resolution.route().id(), "admin");
        assert!(!resolution.was_redirected());
        assert!(resolution.redirect(&[], StatusCode::FOUND).unwrap().is_none());
    }

    #[test]
    fn test_redirect_location_resolves_to_target() {
        let options = RouterOptions {
            server_side_rewrite: true,
            ..RouterOptions::default()
        };
        let router = router_with(
            options,
            vec![
                Route::builder("login").path("signin").build().unwrap(),
                Route::builder("admin").path("admin").auth("admin").redirect("login").build().unwrap(),
            ],
        );

        let resolution = resolve(&router, "/admin").unwrap();
        let redirect = resolution.redirect(&[], StatusCode::FOUND).unwrap().unwrap();
        assert_eq!(redirect.location, "/signin");

        let followed = resolve(&router, &redirect.location).unwrap();
        assert_eq!(followed.route().id(), "login");
    }

    #[test]
    fn test_redirect_chain_reports_last_violator() {
        let router = router_with(
            RouterOptions::default(),
            vec![
                Route::builder("login").path("login").build().unwrap(),
                Route::builder("staff").path("staff").auth("staff").redirect("login").build().unwrap(),
                Route::builder("admin").path("admin").auth("admin").redirect("staff").build().unwrap(),
            ],
        );
        let resolution = resolve(&router, "/admin").unwrap();
        assert_eq!(resolution.route().id(), "login");
        assert_eq!(resolution.matched().id(), "admin");
        assert_eq!(resolution.redirected_by().map(|r| r.id()), Some("staff"));
    }

    #[test]
    fn test_from_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [router]
            locales = ["en"]

            [roles]
            admin = ["member"]

            [[routes]]
            id = "login"
            path = "login"

            [[routes]]
            id = "profile"
            path = "profile"
            auth = "member"
            redirect = "login"
            "#,
        )
        .unwrap();
        let router = Router::from_config(&config).unwrap();
        assert_eq!(router.len(), 2);

        let admin = SessionUser::authenticated("alice", ["admin"]);
        let resolution = router
            .get_route_from_path_info(&SimpleRequest::get("/en/profile"), Some(&admin))
            .unwrap();
        assert_eq!(resolution.route().id(), "profile");
        assert_eq!(resolution.locale(), Some("en"));
    }

    #[test]
    fn test_from_config_rejects_unknown_redirect() {
        let config: AppConfig = toml::from_str(
            r#"
            [[routes]]
            id = "profile"
            auth = "member"
            redirect = "login"
            "#,
        )
        .unwrap();
        assert!(matches!(
            Router::from_config(&config),
            Err(RoutingError::UnknownRedirectTarget { .. })
        ));
    }

    #[test]
    fn test_redirect_chain_cycle() {
        let router = router_with(
            RouterOptions::default(),
            vec![
                Route::builder("a").path("a").auth("x").redirect("b").build().unwrap(),
                Route::builder("b").path("b").auth("x").redirect("a").build().unwrap(),
            ],
        );
        let err = resolve(&router, "/a").unwrap_err();
        assert!(matches!(err, RoutingError::CircularRedirect(ref id) if id == "a"));
    }

    #[test]
    fn test_missing_redirect_is_fatal() {
        let router = router_with(
            RouterOptions::default(),
            vec![Route::builder("vault").path("vault").auth("admin").build().unwrap()],
        );
        let err = resolve(&router, "/vault").unwrap_err();
        assert!(matches!(err, RoutingError::NoRedirectConfigured(_)));
    }

    #[test]
    fn test_validate_redirect_targets() {
        let router = router_with(
            RouterOptions::default(),
            vec![Route::builder("admin").auth("admin").redirect("login").build().unwrap()],
        );
        assert!(matches!(
            router.validate(),
            Err(RoutingError::UnknownRedirectTarget { .. })
        ));
    }

    #[test]
    fn test_custom_authenticator() {
        #[derive(Debug)]
        struct AllowAll;

        impl RouteAuthenticator for AllowAll {
            fn authenticate(&self, _: &Route, _: Option<&dyn User>, _: &mut RequestContext) -> bool {
                true
            }

            fn handle_violation(
                &self,
                route: &Arc<Route>,
                _: &Router,
                _: &mut RequestContext,
            ) -> Result<Arc<Route>, RoutingError> {
                Err(RoutingError::NoRedirectConfigured(route.id().to_string()))
            }
        }

        let mut router = router_with(
            RouterOptions::default(),
            vec![Route::builder("vault").path("vault").auth("admin").build().unwrap()],
        );
        router.set_authenticator(Arc::new(AllowAll));
        assert_eq!(resolve(&router, "/vault").unwrap().route().id(), "vault");
    }
}
