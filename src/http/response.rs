//! Response mapping for routing outcomes.
//!
//! # Responsibilities
//! - Map routing errors to HTTP status codes with a JSON body
//! - Reject undecodable request paths with 400
//! - Turn an authentication redirect into a `Location` response
//!
//! # Design Decisions
//! - Not found → 404, everything else → 500
//! - Fatal errors never expose route internals beyond the error message

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::http::request::RequestError;
use crate::routing::{ErrorKind, Redirect, RoutingError};

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "not_found",
        ErrorKind::Fatal => "routing_failed",
        ErrorKind::Configuration => "configuration",
        ErrorKind::Usage => "usage",
    }
}

impl IntoResponse for RoutingError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: error_code(kind),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: "bad_request",
            message: self.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Build the client redirect response.
pub fn redirect_response(redirect: &Redirect) -> Response {
    match HeaderValue::from_str(&redirect.location) {
        Ok(location) => (redirect.status, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::error!(location = %redirect.location, "Redirect location is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
