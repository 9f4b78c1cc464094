//! Path templates, placeholders and compiled match expressions.
//!
//! # Responsibilities
//! - Parse `{name}` / `{name=default}` tokens out of a path template
//! - Derive a match expression from a template when none is configured
//! - Compile match expressions for full and suffix ("relative") matching
//! - Turn capture groups into placeholder values
//!
//! # Design Decisions
//! - Capture group `n` belongs to the `n`-th declared placeholder
//! - Placeholder patterns should only use non-capturing groups
//! - Trailing groups that did not participate are treated as "not produced",
//!   so they can be back-filled from declared defaults

use regex::Regex;

use crate::routing::error::RoutingError;

/// Match pattern used for placeholders that do not declare one.
pub const DEFAULT_PLACEHOLDER_PATTERN: &str = "[^/]+";

/// A named, typed segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    name: String,
    pattern: String,
    default: Option<String>,
}

impl Placeholder {
    /// Create a placeholder with the default match pattern and no default value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: DEFAULT_PLACEHOLDER_PATTERN.to_string(),
            default: None,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub(crate) fn set_default(&mut self, default: Option<String>) {
        if default.is_some() {
            self.default = default;
        }
    }
}

/// One piece of a parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TemplateToken {
    Literal(String),
    Placeholder { name: String, default: Option<String> },
}

/// Split a template into literal text and placeholder tokens.
///
/// An opening brace without a closing one is kept as literal text.
pub(crate) fn parse_template(template: &str) -> Vec<TemplateToken> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };

        literal.push_str(&rest[..open]);
        if !literal.is_empty() {
            tokens.push(TemplateToken::Literal(std::mem::take(&mut literal)));
        }

        let inner = &rest[open + 1..close];
        let (name, default) = match inner.split_once('=') {
            Some((name, default)) => (name.trim(), Some(default.trim().to_string())),
            None => (inner.trim(), None),
        };
        tokens.push(TemplateToken::Placeholder {
            name: name.to_string(),
            default,
        });

        rest = &rest[close + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        tokens.push(TemplateToken::Literal(literal));
    }
    tokens
}

/// Build a match expression from a template.
///
/// Placeholders become capture groups using their declared pattern. A
/// placeholder with a default is optional, and so is the slash before it.
pub(crate) fn derive_expression(tokens: &[TemplateToken], placeholders: &[Placeholder]) -> String {
    let mut expr = String::new();

    for token in tokens {
        match token {
            TemplateToken::Literal(text) => expr.push_str(&regex::escape(text)),
            TemplateToken::Placeholder { name, .. } => {
                let Some(placeholder) = placeholders.iter().find(|p| p.name == *name) else {
                    continue;
                };
                if placeholder.default.is_some() {
                    if expr.ends_with('/') {
                        expr.pop();
                        expr.push_str(&format!("(?:/({}))?", placeholder.pattern));
                    } else {
                        expr.push_str(&format!("({})?", placeholder.pattern));
                    }
                } else {
                    expr.push_str(&format!("({})", placeholder.pattern));
                }
            }
        }
    }
    expr
}

/// A compiled match expression.
#[derive(Debug, Clone)]
pub struct MatchExpression {
    source: String,
    full: Regex,
    suffix: Regex,
}

impl MatchExpression {
    /// Compile `source` for full (`^expr$`) and suffix matching.
    pub fn compile(route_id: &str, source: impl Into<String>) -> Result<Self, RoutingError> {
        let source = source.into();
        let invalid = |source: regex::Error| RoutingError::InvalidMatchExpression {
            route: route_id.to_string(),
            source,
        };

        let full = Regex::new(&format!("^(?:{})$", source)).map_err(invalid)?;
        let suffix = Regex::new(&format!("(?:^|/)(?:{})$", source)).map_err(invalid)?;

        Ok(Self {
            source,
            full,
            suffix,
        })
    }

    /// The expression as configured or derived, without anchors.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true if the whole path matches.
    pub fn is_full_match(&self, path: &str) -> bool {
        self.full.is_match(path)
    }

    /// Returns true if the path ends with a segment sequence matching the expression.
    pub fn is_suffix_match(&self, path: &str) -> bool {
        self.suffix.is_match(path)
    }

    /// Capture groups produced against `path`.
    ///
    /// Tries a full match first and, when `relative` is set, a suffix match.
    /// Trailing groups that did not participate are dropped.
    pub(crate) fn captures(&self, path: &str, relative: bool) -> Option<Vec<Option<String>>> {
        let caps = self.full.captures(path).or_else(|| {
            if relative {
                self.suffix.captures(path)
            } else {
                None
            }
        })?;

        let mut groups: Vec<Option<String>> = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();

        while matches!(groups.last(), Some(None)) {
            groups.pop();
        }
        Some(groups)
    }
}

/// Returns true for captured values that count as "absent".
pub(crate) fn is_absent_value(value: &str) -> bool {
    value.is_empty() || value == "0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template() {
        let tokens = parse_template("user/{id}/posts/{page=1}");
        assert_eq!(
            tokens,
            vec![
                TemplateToken::Literal("user/".into()),
                TemplateToken::Placeholder {
                    name: "id".into(),
                    default: None
                },
                TemplateToken::Literal("/posts/".into()),
                TemplateToken::Placeholder {
                    name: "page".into(),
                    default: Some("1".into())
                },
            ]
        );
    }

    #[test]
    fn test_parse_template_unclosed_brace_is_literal() {
        let tokens = parse_template("odd/{name");
        assert_eq!(tokens, vec![TemplateToken::Literal("odd/{name".into())]);
    }

    #[test]
    fn test_derive_expression_optional_default() {
        let tokens = parse_template("user/{id}/{tab=profile}");
        let placeholders = vec![
            Placeholder::new("id").with_pattern(r"\d+"),
            Placeholder::new("tab").with_default("profile"),
        ];
        let expr = derive_expression(&tokens, &placeholders);
        assert_eq!(expr, r"user/(\d+)(?:/([^/]+))?");
    }

    #[test]
    fn test_full_and_suffix_match() {
        let expr = MatchExpression::compile("about", "about").unwrap();
        assert!(expr.is_full_match("about"));
        assert!(!expr.is_full_match("en/about"));
        assert!(expr.is_suffix_match("en/about"));
        assert!(!expr.is_suffix_match("en/xabout"));
    }

    #[test]
    fn test_captures_drop_trailing_unmatched_groups() {
        let expr = MatchExpression::compile("user", r"user/(\d+)(?:/([^/]+))?").unwrap();
        assert_eq!(expr.captures("user/5", false), Some(vec![Some("5".into())]));
        assert_eq!(
            expr.captures("user/5/edit", false),
            Some(vec![Some("5".into()), Some("edit".into())])
        );
        assert_eq!(expr.captures("team/user/5", false), None);
        assert_eq!(
            expr.captures("team/user/5", true),
            Some(vec![Some("5".into())])
        );
    }

    #[test]
    fn test_invalid_expression() {
        let err = MatchExpression::compile("broken", "user/(").unwrap_err();
        assert!(matches!(err, RoutingError::InvalidMatchExpression { .. }));
    }
}
