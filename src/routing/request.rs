//! The request abstraction consumed by the router.

use axum::http::Method;

/// What the router needs to know about an inbound request.
///
/// Path info is expected to be URL-decoded already. Leading and trailing
/// slashes are tolerated.
pub trait RequestInfo {
    fn method(&self) -> &Method;

    /// Path below the entry point script, e.g. `/user/42`.
    fn path_info(&self) -> &str;

    /// Entry point script, e.g. `/index.php`.
    fn script_name(&self) -> &str;

    fn host(&self) -> Option<&str> {
        None
    }

    fn is_secure(&self) -> bool {
        false
    }
}

/// A plain owned request, for callers that are not behind an HTTP stack.
#[derive(Debug, Clone)]
pub struct SimpleRequest {
    pub method: Method,
    pub path_info: String,
    pub script_name: String,
    pub host: Option<String>,
    pub secure: bool,
}

impl SimpleRequest {
    pub fn new(method: Method, path_info: impl Into<String>) -> Self {
        Self {
            method,
            path_info: path_info.into(),
            script_name: "/index.php".to_string(),
            host: None,
            secure: false,
        }
    }

    pub fn get(path_info: impl Into<String>) -> Self {
        Self::new(Method::GET, path_info)
    }

    pub fn with_script(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

impl RequestInfo for SimpleRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path_info(&self) -> &str {
        &self.path_info
    }

    fn script_name(&self) -> &str {
        &self.script_name
    }

    fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    fn is_secure(&self) -> bool {
        self.secure
    }
}
