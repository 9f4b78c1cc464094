//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, session)
//! - Resolve each request through the route table
//! - Answer authentication redirects, hand everything else to controllers
//! - Observability (metrics, structured logs)

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::http::dispatch::DispatchTable;
use crate::http::middleware::session_middleware;
use crate::http::request::HttpRequest;
use crate::http::response::redirect_response;
use crate::observability::metrics;
use crate::routing::{ErrorKind, RoutingError};
use crate::security::{SessionUser, User};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<ArcSwap<DispatchTable>>,
}

/// HTTP server for the route dispatcher.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server over a swappable dispatch table.
    ///
    /// With `trust_session_headers` the requesting user is read from
    /// front-end headers, see [`crate::http::middleware::session`].
    pub fn new(table: Arc<ArcSwap<DispatchTable>>, trust_session_headers: bool) -> Self {
        let router = Self::build_router(AppState { table }, trust_session_headers);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState, trust_session_headers: bool) -> Router {
        let router = Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state);

        let router = if trust_session_headers {
            router.layer(middleware::from_fn(session_middleware))
        } else {
            router
        };

        router.layer(TraceLayer::new_for_http())
    }

    /// The assembled application, e.g. for in-process testing.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn outcome(err: &RoutingError) -> &'static str {
    match err.kind() {
        ErrorKind::NotFound => "not_found",
        _ => "fatal",
    }
}

/// Main dispatch handler.
/// Resolves the route, answers redirects, and calls the bound controller.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let table = state.table.load_full();
    let user = request.extensions().get::<SessionUser>().cloned();

    let resolved = {
        let info = match HttpRequest::new(&request, table.script_name()) {
            Ok(info) => info,
            Err(err) => {
                metrics::record_resolution("bad_request");
                tracing::debug!(path = %request.uri().path(), error = %err, "Rejected request path");
                return err.into_response();
            }
        };
        table
            .router()
            .get_route_from_path_info(&info, user.as_ref().map(|u| u as &dyn User))
    };

    let resolution = match resolved {
        Ok(resolution) => resolution,
        Err(err) => {
            metrics::record_resolution(outcome(&err));
            if err.is_fatal() {
                tracing::error!(path = %request.uri().path(), error = %err, "Route resolution failed");
            } else {
                tracing::debug!(path = %request.uri().path(), error = %err, "No route matched");
            }
            return err.into_response();
        }
    };

    if let Some(violator) = resolution.redirected_by() {
        metrics::record_auth_redirect(violator.id());
    }

    match resolution.redirect(&[], StatusCode::FOUND) {
        Ok(Some(redirect)) => {
            metrics::record_resolution("redirected");
            tracing::info!(
                route = %resolution.matched().id(),
                location = %redirect.location,
                "Redirecting unauthorised request"
            );
            return redirect_response(&redirect);
        }
        Ok(None) => {}
        Err(err) => {
            metrics::record_resolution(outcome(&err));
            return err.into_response();
        }
    }

    let route_id = resolution.route().id().to_string();
    let Some(controller) = table.controller(&route_id).cloned() else {
        metrics::record_resolution("unbound");
        tracing::warn!(route = %route_id, "Route has no controller");
        return (StatusCode::NOT_IMPLEMENTED, "Route has no controller").into_response();
    };

    metrics::record_resolution("matched");
    tracing::debug!(route = %route_id, method = ?resolution.route().method_name(), "Dispatching");

    let response = controller.handle(resolution, request).await;
    metrics::record_dispatch(&route_id, response.status().as_u16(), start);
    response
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
