//! Session middleware.
//! Attaches the requesting user to the request for route authentication.
//!
//! Identity is taken from headers set by a trusted front end (an auth
//! gateway or SSO proxy). Only enable it behind such a front end.

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::security::SessionUser;

/// Authenticated user name.
pub const X_SESSION_USER: &str = "x-session-user";
/// Comma-separated role list.
pub const X_SESSION_ROLES: &str = "x-session-roles";

/// Read a session user from trusted headers.
pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionUser> {
    let name = headers
        .get(X_SESSION_USER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())?;

    let roles: Vec<String> = headers
        .get(X_SESSION_ROLES)
        .and_then(|v| v.to_str().ok())
        .map(|roles| {
            roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(SessionUser::authenticated(name, roles))
}

pub async fn session_middleware(mut req: Request<Body>, next: Next) -> Response {
    // An earlier layer may already have attached a user.
    if req.extensions().get::<SessionUser>().is_none() {
        if let Some(user) = session_from_headers(req.headers()) {
            tracing::debug!(user = %user.name, roles = ?user.roles, "Session attached");
            req.extensions_mut().insert(user);
        }
    }
    next.run(req).await
}
