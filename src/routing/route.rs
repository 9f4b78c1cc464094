//! Route definitions.
//!
//! # Responsibilities
//! - Describe one routable endpoint (pattern, placeholders, methods, auth)
//! - Generate paths and URLs from the path template
//! - Extract placeholder values from the current request, lazily and per request
//! - Build the redirect target used when access is denied
//!
//! # Design Decisions
//! - A Route is immutable once registered and shared through `Arc`
//! - Request data lives in [`RequestContext`], never on the Route
//! - The URL prefix is computed once, when the Router registers the route

use std::path::Path;

use axum::http::{Method, StatusCode};

use crate::routing::context::{PathParameters, RequestContext};
use crate::routing::error::RoutingError;
use crate::routing::router::Router;
use crate::routing::pattern::{
    derive_expression, is_absent_value, parse_template, MatchExpression, Placeholder,
    TemplateToken,
};

/// Request methods a route may restrict itself to.
pub const SUPPORTED_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Entry point used when a route does not name one.
pub const DEFAULT_SCRIPT: &str = "index.php";

/// The set of methods a route accepts. Empty means "all methods".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet {
    methods: Vec<Method>,
}

impl MethodSet {
    /// Parse method names, rejecting anything outside [`SUPPORTED_METHODS`].
    pub fn parse<I, S>(route_id: &str, names: I) -> Result<Self, RoutingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut methods: Vec<Method> = Vec::new();

        for name in names {
            let upper = name.as_ref().trim().to_ascii_uppercase();
            if !SUPPORTED_METHODS.contains(&upper.as_str()) {
                return Err(RoutingError::InvalidAllowedMethod {
                    route: route_id.to_string(),
                    method: name.as_ref().to_string(),
                });
            }
            let method = Method::from_bytes(upper.as_bytes()).map_err(|_| {
                RoutingError::InvalidAllowedMethod {
                    route: route_id.to_string(),
                    method: name.as_ref().to_string(),
                }
            })?;
            if !methods.contains(&method) {
                methods.push(method);
            }
        }

        Ok(Self { methods })
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    /// A strictly smaller, non-empty set is more specific. An empty set
    /// (all methods) is the least specific.
    pub fn is_more_specific_than(&self, other: &MethodSet) -> bool {
        !self.methods.is_empty() && (other.methods.is_empty() || self.len() < other.len())
    }
}

/// A redirect handed to the HTTP layer: where to go and with which status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: StatusCode,
}

/// One configured endpoint.
#[derive(Debug, Clone)]
pub struct Route {
    id: String,
    script_name: String,
    path_template: String,
    tokens: Vec<TemplateToken>,
    expression: MatchExpression,
    relative: bool,
    placeholders: Vec<Placeholder>,
    methods: MethodSet,
    auth: Option<String>,
    auth_parameters: Option<String>,
    redirect: Option<String>,
    controller: Option<String>,
    method_name: Option<String>,
    url_prefix: String,
}

impl Route {
    /// Start building a route with the given id.
    pub fn builder(id: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    pub fn match_expression(&self) -> &MatchExpression {
        &self.expression
    }

    /// Whether the route may also match as a path suffix.
    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    pub fn placeholder(&self, name: &str) -> Option<&Placeholder> {
        self.placeholders.iter().find(|p| p.name() == name)
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.allows(method)
    }

    /// Role required to use this route. `None` means public.
    pub fn auth(&self) -> Option<&str> {
        self.auth.as_deref()
    }

    pub fn auth_parameters(&self) -> Option<&str> {
        self.auth_parameters.as_deref()
    }

    /// Route id to fall back to when authentication fails.
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    pub fn controller(&self) -> Option<&str> {
        self.controller.as_deref()
    }

    pub fn method_name(&self) -> Option<&str> {
        self.method_name.as_deref()
    }

    /// Prefix prepended to the path by [`Route::url`].
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub(crate) fn bind_url_prefix(&mut self, prefix: String) {
        self.url_prefix = prefix;
    }

    /// Render the path template.
    ///
    /// Each placeholder takes the value passed in `params`, else its declared
    /// default.
    pub fn path(&self, params: &[(&str, &str)]) -> Result<String, RoutingError> {
        self.render_path(params, None)
    }

    /// Render the path template for the current request.
    ///
    /// Like [`Route::path`], but values already extracted from the request
    /// are used before declared defaults. The context is not modified.
    pub fn path_in(
        &self,
        ctx: &RequestContext,
        params: &[(&str, &str)],
    ) -> Result<String, RoutingError> {
        self.render_path(params, ctx.cached_parameters(&self.id))
    }

    /// The URL prefix followed by [`Route::path`].
    pub fn url(&self, params: &[(&str, &str)]) -> Result<String, RoutingError> {
        Ok(format!("{}{}", self.url_prefix, self.path(params)?))
    }

    /// The URL prefix followed by [`Route::path_in`].
    pub fn url_in(
        &self,
        ctx: &RequestContext,
        params: &[(&str, &str)],
    ) -> Result<String, RoutingError> {
        Ok(format!("{}{}", self.url_prefix, self.path_in(ctx, params)?))
    }

    /// Value of placeholder `name` in the current request.
    ///
    /// The request path is parsed the first time any parameter of this
    /// route is requested; later calls within the same context reuse it.
    pub fn path_parameter(&self, ctx: &mut RequestContext, name: &str) -> Option<String> {
        self.parameters(ctx).get(name).map(str::to_string)
    }

    /// Like [`Route::path_parameter`], falling back to `default`.
    pub fn path_parameter_or(&self, ctx: &mut RequestContext, name: &str, default: &str) -> String {
        self.path_parameter(ctx, name)
            .unwrap_or_else(|| default.to_string())
    }

    /// Build the redirect used when access to this route is denied.
    ///
    /// The location is the URL of the redirect target route, so targets
    /// whose id differs from their path are reached correctly.
    pub fn redirect(
        &self,
        router: &Router,
        ctx: &RequestContext,
        query: &[(&str, &str)],
        status: StatusCode,
    ) -> Result<Redirect, RoutingError> {
        let target_id = self
            .redirect
            .as_deref()
            .ok_or_else(|| RoutingError::NoRedirectConfigured(self.id.clone()))?;
        let target = router
            .get_route(target_id)
            .ok_or_else(|| RoutingError::UnknownRedirectTarget {
                route: self.id.clone(),
                target: target_id.to_string(),
            })?;
        target.redirect_here(ctx, query, status)
    }

    /// A redirect pointing at this route's URL for the current request.
    pub(crate) fn redirect_here(
        &self,
        ctx: &RequestContext,
        query: &[(&str, &str)],
        status: StatusCode,
    ) -> Result<Redirect, RoutingError> {
        let mut location = String::new();
        if let Some(host) = ctx.host() {
            let scheme = if ctx.is_secure() { "https" } else { "http" };
            location.push_str(&format!("{}://{}", scheme, host));
        }
        location.push_str(&self.url_in(ctx, &[])?);

        if !query.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query.iter())
                .finish();
            location.push('?');
            location.push_str(&query);
        }

        Ok(Redirect { location, status })
    }

    /// Extracted parameters for this route, parsed on first use.
    pub(crate) fn parameters<'c>(&self, ctx: &'c mut RequestContext) -> &'c PathParameters {
        let extracted = match ctx.cached_parameters(&self.id) {
            Some(_) => None,
            None => Some(self.extract_parameters(ctx.checked_path())),
        };
        ctx.cache_parameters(&self.id, extracted.unwrap_or_default())
    }

    /// Parse `path` into placeholder values.
    pub(crate) fn extract_parameters(&self, path: &str) -> PathParameters {
        let Some(mut groups) = self.expression.captures(path, self.relative) else {
            return PathParameters::default();
        };

        let expected = self.placeholders.len();
        if groups.len() > expected {
            return PathParameters::default();
        }

        while groups.len() < expected {
            match self.placeholders[groups.len()].default_value() {
                Some(default) => groups.push(Some(default.to_string())),
                None => break,
            }
        }
        if groups.len() != expected {
            return PathParameters::default();
        }

        let values = self
            .placeholders
            .iter()
            .zip(groups)
            .map(|(placeholder, value)| {
                (
                    placeholder.name().to_string(),
                    value.filter(|v| !is_absent_value(v)),
                )
            })
            .collect();
        PathParameters::new(values)
    }

    /// Placeholder counts used by the tie-break: groups that captured a
    /// value against `path`, and placeholders holding a value after default
    /// back-fill.
    pub(crate) fn placeholder_profile(&self, path: &str) -> (usize, usize) {
        let satisfied = self
            .expression
            .captures(path, self.relative)
            .map(|groups| {
                groups
                    .iter()
                    .take(self.placeholders.len())
                    .filter(|g| g.as_deref().is_some_and(|v| !is_absent_value(v)))
                    .count()
            })
            .unwrap_or(0);
        let present = self.extract_parameters(path).present();
        (satisfied, present)
    }

    fn render_path(
        &self,
        params: &[(&str, &str)],
        cached: Option<&PathParameters>,
    ) -> Result<String, RoutingError> {
        let mut path = String::with_capacity(self.path_template.len());

        for token in &self.tokens {
            match token {
                TemplateToken::Literal(text) => path.push_str(text),
                TemplateToken::Placeholder { name, .. } => {
                    let placeholder = self.placeholder(name).ok_or_else(|| {
                        RoutingError::MissingPlaceholderDeclaration {
                            route: self.id.clone(),
                            placeholder: name.clone(),
                        }
                    })?;
                    let value = params
                        .iter()
                        .find(|(n, _)| *n == name.as_str())
                        .map(|(_, v)| *v)
                        .or_else(|| cached.and_then(|c| c.get(name)))
                        .or_else(|| placeholder.default_value())
                        .ok_or_else(|| RoutingError::MissingPathParameter {
                            route: self.id.clone(),
                            placeholder: name.clone(),
                        })?;
                    path.push_str(value);
                }
            }
        }

        Ok(path.trim_end_matches('/').to_string())
    }
}

/// Compute the URL prefix for a script.
///
/// With server-side rewriting the script basename is used (and dropped for
/// `index`); otherwise the assets path and the literal script name.
pub(crate) fn compose_url_prefix(script_name: &str, rewrite: bool, assets_path: &str) -> String {
    if rewrite {
        let basename = script_basename(script_name);
        if basename.is_empty() || basename == "index" {
            "/".to_string()
        } else {
            format!("/{}/", basename)
        }
    } else {
        let assets = assets_path.trim_matches('/');
        let script = script_name.trim_start_matches('/');
        if assets.is_empty() {
            format!("/{}/", script)
        } else {
            format!("/{}/{}/", assets, script)
        }
    }
}

/// File stem of a script path: `/admin.php` → `admin`.
pub(crate) fn script_basename(script_name: &str) -> &str {
    Path::new(script_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
}

/// Builder for [`Route`]. Validation happens in [`RouteBuilder::build`].
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    id: String,
    script_name: String,
    path: String,
    match_expression: Option<String>,
    relative: bool,
    placeholders: Vec<Placeholder>,
    methods: Vec<String>,
    auth: Option<String>,
    auth_parameters: Option<String>,
    redirect: Option<String>,
    controller: Option<String>,
    method_name: Option<String>,
}

impl RouteBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script_name: DEFAULT_SCRIPT.to_string(),
            path: String::new(),
            match_expression: None,
            relative: false,
            placeholders: Vec::new(),
            methods: Vec::new(),
            auth: None,
            auth_parameters: None,
            redirect: None,
            controller: None,
            method_name: None,
        }
    }

    pub fn script(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    /// Path template, e.g. `user/{id}` or `list/{page=1}`.
    pub fn path(mut self, template: impl Into<String>) -> Self {
        self.path = template.into();
        self
    }

    /// Explicit match expression. Every template placeholder must then be
    /// declared, in the order of the expression's capture groups.
    pub fn match_expression(mut self, expr: impl Into<String>) -> Self {
        self.match_expression = Some(expr.into());
        self
    }

    pub fn relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    pub fn placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholders.push(placeholder);
        self
    }

    pub fn methods<S: Into<String>>(mut self, methods: impl IntoIterator<Item = S>) -> Self {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn auth(mut self, role: impl Into<String>) -> Self {
        self.auth = Some(role.into());
        self
    }

    pub fn auth_parameters(mut self, params: impl Into<String>) -> Self {
        self.auth_parameters = Some(params.into());
        self
    }

    pub fn redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    pub fn controller(mut self, controller: impl Into<String>, method: Option<String>) -> Self {
        self.controller = Some(controller.into());
        self.method_name = method;
        self
    }

    pub fn build(self) -> Result<Route, RoutingError> {
        let methods = MethodSet::parse(&self.id, &self.methods)?;
        let tokens = parse_template(&self.path);
        let placeholders = self.resolve_placeholders(&tokens)?;

        let source = match &self.match_expression {
            Some(expr) => expr.clone(),
            None if !self.path.is_empty() => derive_expression(&tokens, &placeholders),
            None => regex::escape(&self.id),
        };
        let expression = MatchExpression::compile(&self.id, source)?;

        Ok(Route {
            url_prefix: "/".to_string(),
            id: self.id,
            script_name: self.script_name,
            path_template: self.path,
            tokens,
            expression,
            relative: self.relative,
            placeholders,
            methods,
            auth: self.auth,
            auth_parameters: self.auth_parameters,
            redirect: self.redirect,
            controller: self.controller,
            method_name: self.method_name,
        })
    }

    /// Order placeholders and merge inline template defaults.
    ///
    /// A derived expression captures in template order, so placeholders
    /// follow the template. An explicit expression captures in declaration
    /// order, so declarations are kept as given and must cover the template.
    fn resolve_placeholders(&self, tokens: &[TemplateToken]) -> Result<Vec<Placeholder>, RoutingError> {
        let referenced = tokens.iter().filter_map(|t| match t {
            TemplateToken::Placeholder { name, default } => Some((name, default)),
            TemplateToken::Literal(_) => None,
        });

        if self.match_expression.is_some() {
            let mut placeholders = self.placeholders.clone();
            for (name, default) in referenced {
                let declared = placeholders
                    .iter_mut()
                    .find(|p| p.name() == name.as_str())
                    .ok_or_else(|| RoutingError::MissingPlaceholderDeclaration {
                        route: self.id.clone(),
                        placeholder: name.clone(),
                    })?;
                declared.set_default(default.clone());
            }
            return Ok(placeholders);
        }

        let mut placeholders: Vec<Placeholder> = Vec::new();
        for (name, default) in referenced {
            if placeholders.iter().any(|p| p.name() == name.as_str()) {
                continue;
            }
            let mut placeholder = self
                .placeholders
                .iter()
                .find(|p| p.name() == name.as_str())
                .cloned()
                .unwrap_or_else(|| Placeholder::new(name.clone()));
            placeholder.set_default(default.clone());
            placeholders.push(placeholder);
        }

        for unused in self
            .placeholders
            .iter()
            .filter(|p| !placeholders.iter().any(|kept| kept.name() == p.name()))
        {
            tracing::warn!(
                route = %self.id,
                placeholder = %unused.name(),
                "Placeholder is not referenced by the path template, ignoring"
            );
        }

        Ok(placeholders)
    }
}
