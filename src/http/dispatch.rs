//! Controller registry and dispatch table.
//!
//! # Responsibilities
//! - Register controllers under the names routes refer to
//! - Resolve every route's controller reference once per router build
//! - Hand the resolved request to the route's controller
//! - Provide the `echo` controller used by the server binary and tests
//!
//! # Design Decisions
//! - Unknown controller references fail the build, not the request
//! - A router and its dispatch table are swapped together on reload

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::routing::{Resolution, Router};

/// Application code reached through a route.
pub trait Controller: Send + Sync {
    /// Handle a request whose route has been approved.
    ///
    /// The route's method name is available as
    /// `resolution.route().method_name()`.
    fn handle(&self, resolution: Resolution, request: Request<Body>) -> BoxFuture<'static, Response>;
}

impl<F, Fut> Controller for F
where
    F: Fn(Resolution, Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle(&self, resolution: Resolution, request: Request<Body>) -> BoxFuture<'static, Response> {
        Box::pin(self(resolution, request))
    }
}

/// Answers with the resolved route, its locale and parameters as JSON.
pub async fn echo(resolution: Resolution, request: Request<Body>) -> Response {
    let parameters: BTreeMap<&str, &str> = resolution.parameters().iter().collect();
    Json(serde_json::json!({
        "route": resolution.route().id(),
        "method": resolution.route().method_name(),
        "path": request.uri().path(),
        "locale": resolution.locale(),
        "parameters": parameters,
    }))
    .into_response()
}

/// Errors raised while binding routes to controllers.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("route '{route}' refers to unregistered controller '{controller}'")]
    UnknownController { route: String, controller: String },
}

/// Controllers by name.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `controller` under `name`, replacing any previous entry.
    pub fn register<C>(&mut self, name: impl Into<String>, controller: C) -> &mut Self
    where
        C: Controller + 'static,
    {
        self.controllers.insert(name.into(), Arc::new(controller));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    /// Bind each route of `router` to its controller.
    ///
    /// Routes without a controller reference stay unbound.
    pub fn resolve(
        &self,
        router: Arc<Router>,
        script_name: impl Into<String>,
    ) -> Result<DispatchTable, DispatchError> {
        let mut bound = HashMap::new();
        for route in router.routes() {
            let Some(name) = route.controller() else {
                continue;
            };
            let controller = self.controllers.get(name).ok_or_else(|| {
                DispatchError::UnknownController {
                    route: route.id().to_string(),
                    controller: name.to_string(),
                }
            })?;
            bound.insert(route.id().to_string(), Arc::clone(controller));
        }

        tracing::debug!(routes = router.len(), bound = bound.len(), "Dispatch table built");
        Ok(DispatchTable {
            router,
            controllers: bound,
            script_name: script_name.into(),
        })
    }
}

/// A router with its routes bound to controllers.
pub struct DispatchTable {
    router: Arc<Router>,
    controllers: HashMap<String, Arc<dyn Controller>>,
    script_name: String,
}

impl DispatchTable {
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Entry script reported for every request.
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn controller(&self, route_id: &str) -> Option<&Arc<dyn Controller>> {
        self.controllers.get(route_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{Route, RouterOptions, SimpleRequest};

    fn router() -> Arc<Router> {
        let mut router = Router::new(RouterOptions::default());
        router
            .add_route(Route::builder("home").path("home").controller("pages", Some("home".into())).build().unwrap())
            .unwrap();
        router
            .add_route(Route::builder("static").path("static").build().unwrap())
            .unwrap();
        Arc::new(router)
    }

    async fn ok(_: Resolution, _: Request<Body>) -> Response {
        "ok".into_response()
    }

    #[test]
    fn test_resolve_binds_controllers() {
        let mut registry = HandlerRegistry::new();
        registry.register("pages", ok);
        assert!(registry.contains("pages"));

        let table = registry.resolve(router(), "/index.php").unwrap();
        assert!(table.controller("home").is_some());
        assert!(table.controller("static").is_none());
        assert_eq!(table.script_name(), "/index.php");
    }

    #[tokio::test]
    async fn test_echo_reports_resolution() {
        let mut router = Router::new(RouterOptions::default());
        router
            .add_route(Route::builder("product").path("product/{id}").build().unwrap())
            .unwrap();
        let resolution = router
            .get_route_from_path_info(&SimpleRequest::get("/product/7"), None)
            .unwrap();

        let response = echo(resolution, Request::new(Body::empty())).await;
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["route"], "product");
        assert_eq!(body["parameters"]["id"], "7");
    }

    #[test]
    fn test_unknown_controller() {
        let registry = HandlerRegistry::new();
        let err = registry.resolve(router(), "/index.php").err().unwrap();
        assert!(matches!(
            err,
            DispatchError::UnknownController { ref route, ref controller }
                if route == "home" && controller == "pages"
        ));
    }
}
