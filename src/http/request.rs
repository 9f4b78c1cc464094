//! Adapter from axum requests to the router's request abstraction.
//!
//! # Responsibilities
//! - Report method, path info and script name for an HTTP request
//! - Percent-decode the path info before it reaches the router
//! - Derive host and scheme from headers for absolute redirects
//!
//! # Design Decisions
//! - Borrows the request; the path is only copied when decoding changes it
//! - The script name comes from configuration, one entry script per server
//! - A leading script name in the URI is removed from the path info
//! - Paths that do not decode to UTF-8 are rejected, never passed on lossily

use std::borrow::Cow;

use axum::http::{header, uri::Scheme, Method, Request};
use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::routing::RequestInfo;

/// Errors raised while adapting an HTTP request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request path is not valid UTF-8 once percent-decoded")]
    InvalidPathEncoding,
}

/// Header set by TLS-terminating front ends.
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Borrowed view of an HTTP request for [`crate::routing::Router`].
#[derive(Debug)]
pub struct HttpRequest<'a, B> {
    request: &'a Request<B>,
    script_name: &'a str,
    path_info: Cow<'a, str>,
}

impl<'a, B> HttpRequest<'a, B> {
    pub fn new(request: &'a Request<B>, script_name: &'a str) -> Result<Self, RequestError> {
        let path = request.uri().path();
        let raw = match path.strip_prefix(script_name) {
            Some(rest) if !script_name.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
            _ => path,
        };
        let path_info = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| RequestError::InvalidPathEncoding)?;

        Ok(Self {
            request,
            script_name,
            path_info,
        })
    }
}

impl<B> RequestInfo for HttpRequest<'_, B> {
    fn method(&self) -> &Method {
        self.request.method()
    }

    fn path_info(&self) -> &str {
        &self.path_info
    }

    fn script_name(&self) -> &str {
        self.script_name
    }

    fn host(&self) -> Option<&str> {
        self.request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.request.uri().authority().map(|a| a.as_str()))
    }

    fn is_secure(&self) -> bool {
        if self.request.uri().scheme() == Some(&Scheme::HTTPS) {
            return true;
        }
        self.request
            .headers()
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
    }
}
