//! Request-scoped routing state.
//!
//! # Responsibilities
//! - Hold the path that matching ran against (script/locale segments removed)
//! - Remember the locale prefix found in the request
//! - Cache extracted path parameters per route for the current request
//! - Track routes visited while resolving authentication redirects
//!
//! # Design Decisions
//! - One context per request; Router and Route never hold request data
//! - Plain owned data so a context can travel in request extensions

use std::collections::{HashMap, HashSet};

use axum::http::Method;

/// Values extracted for one route's placeholders, in declaration order.
///
/// An abandoned extraction (capture count did not line up with the declared
/// placeholders) holds no values at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParameters {
    values: Vec<(String, Option<String>)>,
}

impl PathParameters {
    pub(crate) fn new(values: Vec<(String, Option<String>)>) -> Self {
        Self { values }
    }

    /// The value for `name`, if one was extracted.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Number of placeholders holding a value.
    pub fn present(&self) -> usize {
        self.values.iter().filter(|(_, v)| v.is_some()).count()
    }

    /// True when extraction was abandoned or the route has no placeholders.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(name, value)` pairs that hold a value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter_map(|(n, v)| v.as_deref().map(|v| (n.as_str(), v)))
    }
}

/// Everything the router derives from a single request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path_info: String,
    script_name: String,
    host: Option<String>,
    secure: bool,
    checked_path: String,
    locale: Option<String>,
    parameters: HashMap<String, PathParameters>,
    violations: HashSet<String>,
    interrupted_path: Option<String>,
}

impl RequestContext {
    pub(crate) fn new(
        method: Method,
        path_info: impl Into<String>,
        script_name: impl Into<String>,
    ) -> Self {
        Self {
            method,
            path_info: path_info.into(),
            script_name: script_name.into(),
            host: None,
            secure: false,
            checked_path: String::new(),
            locale: None,
            parameters: HashMap::new(),
            violations: HashSet::new(),
            interrupted_path: None,
        }
    }

    pub(crate) fn with_host(mut self, host: Option<String>, secure: bool) -> Self {
        self.host = host;
        self.secure = secure;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path info as received.
    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// The path routes were matched against, segments joined with `/`.
    pub fn checked_path(&self) -> &str {
        &self.checked_path
    }

    pub(crate) fn set_checked_path(&mut self, path: String) {
        self.checked_path = path;
    }

    /// Locale prefix stripped from the request path, in its configured spelling.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub(crate) fn set_locale(&mut self, locale: String) {
        self.locale = Some(locale);
    }

    /// The originally requested path when an authentication violation
    /// redirected the request elsewhere.
    pub fn interrupted_path(&self) -> Option<&str> {
        self.interrupted_path.as_deref()
    }

    pub(crate) fn cached_parameters(&self, route_id: &str) -> Option<&PathParameters> {
        self.parameters.get(route_id)
    }

    pub(crate) fn cache_parameters(&mut self, route_id: &str, params: PathParameters) -> &PathParameters {
        self.parameters.entry(route_id.to_string()).or_insert(params)
    }

    /// Returns true if `route_id` already violated authentication during this resolution.
    pub fn has_violated(&self, route_id: &str) -> bool {
        self.violations.contains(route_id)
    }

    /// Record a violating route and remember the first interrupted request path.
    pub fn record_violation(&mut self, route_id: &str) {
        self.violations.insert(route_id.to_string());
        if self.interrupted_path.is_none() {
            self.interrupted_path = Some(self.path_info.clone());
        }
    }

    /// Forget the violation cycle. The interrupted path is kept for the caller.
    pub fn clear_violations(&mut self) {
        self.violations.clear();
    }
}
