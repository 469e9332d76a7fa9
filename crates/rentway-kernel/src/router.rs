//! Gateway router trait and route rule types.
//!
//! The [`GatewayRouter`] trait is the single kernel-level abstraction for
//! request routing.  Implementations (e.g. the table router in
//! `rentway-gateway`) receive [`RouteRule`]s at startup and resolve every
//! inbound `(path, method)` pair to a [`RouteMatch`].

use super::error::GatewayError;
use super::types::{HttpMethod, RouteMatch};
use serde::{Deserialize, Serialize};

/// Marker prefix for regex route patterns.
pub const REGEX_PATTERN_PREFIX: &str = "re:";

/// Placeholder filled with the wildcard remainder of a prefix rule.
pub const WILDCARD_PARAM: &str = "path";

// ─────────────────────────────────────────────────────────────────────────────
// Route pattern
// ─────────────────────────────────────────────────────────────────────────────

/// Precedence tier of a route pattern.  Lower tiers are evaluated first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteKind {
    /// Literal path, matched exactly.
    Exact,
    /// Literal base followed by a wildcard tail (`/vehicles/*`).
    Prefix,
    /// Regular expression (`re:^/vehicles/(?P<id>\d+)$`).
    Pattern,
}

/// Parsed form of [`RouteRule::pattern`].
///
/// ```text
/// /users/profile                       — exact
/// /vehicles/*                          — prefix; remainder fills {path}
/// re:^/ratings/user/(?P<user_id>\d+)$  — regex; named groups fill {name}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Exact(String),
    /// The literal base, without the trailing `/*`.
    Prefix(String),
    /// Regex source, without the `re:` marker.
    Regex(String),
}

impl RoutePattern {
    /// Parse the textual pattern syntax.  Regex sources are not compiled here.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if let Some(source) = raw.strip_prefix(REGEX_PATTERN_PREFIX) {
            if source.trim().is_empty() {
                return Err("regex pattern cannot be empty".to_string());
            }
            return Ok(RoutePattern::Regex(source.to_string()));
        }
        if !raw.starts_with('/') {
            return Err("path pattern must start with '/'".to_string());
        }
        if let Some(base) = raw.strip_suffix("/*") {
            if base.is_empty() {
                return Err("wildcard pattern must name at least one segment".to_string());
            }
            if base.contains('*') {
                return Err("'*' is only allowed as the final segment".to_string());
            }
            return Ok(RoutePattern::Prefix(base.to_string()));
        }
        if raw.contains('*') {
            return Err("'*' is only allowed as the final segment".to_string());
        }
        let exact = if raw.len() > 1 {
            raw.trim_end_matches('/')
        } else {
            raw
        };
        Ok(RoutePattern::Exact(exact.to_string()))
    }

    /// Precedence tier of this pattern.
    pub fn kind(&self) -> RouteKind {
        match self {
            RoutePattern::Exact(_) => RouteKind::Exact,
            RoutePattern::Prefix(_) => RouteKind::Prefix,
            RoutePattern::Regex(_) => RouteKind::Pattern,
        }
    }

    /// The literal path every match of this pattern starts with, cut at a
    /// segment boundary.  `None` for regexes without a literal leading
    /// segment.
    pub fn literal_base(&self) -> Option<String> {
        match self {
            RoutePattern::Exact(path) | RoutePattern::Prefix(path) => Some(path.clone()),
            RoutePattern::Regex(source) => {
                let source = source.strip_prefix('^').unwrap_or(source);
                let literal_len = source
                    .find(|c: char| ".^$*+?()[]{}|\\".contains(c))
                    .unwrap_or(source.len());
                let (literal, rest) = source.split_at(literal_len);
                let base = if rest.is_empty() || rest == "$" {
                    literal
                } else {
                    &literal[..literal.rfind('/').unwrap_or(0)]
                };
                let base = base.trim_end_matches('/');
                (base.starts_with('/') && base.len() > 1).then(|| base.to_string())
            }
        }
    }

    /// First path segment of [`literal_base`](Self::literal_base), e.g.
    /// `vehicles` for `/vehicles/*`.
    pub fn top_level_segment(&self) -> Option<String> {
        self.literal_base().and_then(|base| {
            base.trim_start_matches('/')
                .split('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
        })
    }
}

/// Names of `{placeholder}`s in a rewrite template.
pub fn template_placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                names.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

// ─────────────────────────────────────────────────────────────────────────────
// Route rule
// ─────────────────────────────────────────────────────────────────────────────

/// A single routing rule mapping a path pattern + method set to a backend
/// and a downstream path template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteRule {
    /// Unique stable identifier for this route.
    pub id: String,
    /// Path pattern, see [`RoutePattern`].
    pub pattern: String,
    /// Accepted HTTP methods.  An empty vec means *all* methods are accepted.
    #[serde(default)]
    pub methods: Vec<HttpMethod>,
    /// Id of the backend this route forwards to.
    pub backend_id: String,
    /// Downstream path template, relative to the backend's path prefix.
    pub rewrite: String,
    /// Per-route request timeout in milliseconds (overrides gateway default).
    /// A value of `0` means "use the gateway default".
    #[serde(default)]
    pub timeout_ms: u64,
}

impl RouteRule {
    /// Create a rule accepting all methods.
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        backend_id: impl Into<String>,
        rewrite: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            methods: Vec::new(),
            backend_id: backend_id.into(),
            rewrite: rewrite.into(),
            timeout_ms: 0,
        }
    }

    /// Builder: restrict to specific HTTP methods.
    pub fn with_methods(mut self, methods: Vec<HttpMethod>) -> Self {
        self.methods = methods;
        self
    }

    /// Builder: set a per-route timeout.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Parse [`pattern`](Self::pattern).
    pub fn parsed_pattern(&self) -> Result<RoutePattern, GatewayError> {
        RoutePattern::parse(&self.pattern)
            .map_err(|reason| GatewayError::InvalidPathPattern(self.id.clone(), reason))
    }

    /// Whether this rule accepts `method`.
    pub fn accepts(&self, method: &HttpMethod) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    /// Whether some method is accepted by both rules.
    pub fn methods_overlap(&self, other: &RouteRule) -> bool {
        self.methods.is_empty()
            || other.methods.is_empty()
            || self.methods.iter().any(|m| other.methods.contains(m))
    }

    /// Structural checks run during [`GatewayConfig::validate()`](super::validation::GatewayConfig::validate).
    pub(crate) fn validate(&self) -> Result<RoutePattern, GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyRouteId);
        }
        let pattern = self.parsed_pattern()?;
        if !self.rewrite.starts_with('/') {
            return Err(GatewayError::InvalidRewrite(
                self.id.clone(),
                "rewrite must start with '/'".to_string(),
            ));
        }

        let placeholders = template_placeholders(&self.rewrite);
        match &pattern {
            RoutePattern::Exact(_) => {
                if let Some(name) = placeholders.first() {
                    return Err(GatewayError::InvalidRewrite(
                        self.id.clone(),
                        format!("exact rules cannot use placeholder '{{{name}}}'"),
                    ));
                }
            }
            RoutePattern::Prefix(_) => {
                if let Some(name) = placeholders.iter().find(|n| **n != WILDCARD_PARAM) {
                    return Err(GatewayError::InvalidRewrite(
                        self.id.clone(),
                        format!("prefix rules only support '{{{WILDCARD_PARAM}}}', found '{{{name}}}'"),
                    ));
                }
            }
            RoutePattern::Regex(source) => {
                let regex = regex::Regex::new(source).map_err(|e| {
                    GatewayError::InvalidPathPattern(self.id.clone(), e.to_string())
                })?;
                let groups: Vec<&str> = regex.capture_names().flatten().collect();
                if let Some(name) = placeholders.iter().find(|n| !groups.contains(n)) {
                    return Err(GatewayError::InvalidRewrite(
                        self.id.clone(),
                        format!("placeholder '{{{name}}}' is not a named capture group"),
                    ));
                }
            }
        }
        Ok(pattern)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for request routing.
///
/// Resolution order is fixed: every exact rule, then every prefix rule
/// (longest base first), then every regex rule; within a tier registration
/// order decides.  The first rule whose pattern matches *and* whose method
/// list accepts the request wins.
///
/// The trait is intentionally synchronous: route lookups perform no I/O.
pub trait GatewayRouter: Send + Sync {
    /// Register a new route.  Returns [`GatewayError::DuplicateRoute`] if a
    /// route with the same `id` is already registered.
    fn register(&mut self, route: RouteRule) -> Result<(), GatewayError>;

    /// Resolve a request `(path, method)` to the best matching route.
    /// Returns `None` when no route matches.
    fn resolve(&self, path: &str, method: &HttpMethod) -> Option<RouteMatch>;

    /// Return all registered routes in evaluation order.
    fn routes(&self) -> Vec<&RouteRule>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_kinds_are_detected() {
        assert_eq!(
            RoutePattern::parse("/users/profile").unwrap(),
            RoutePattern::Exact("/users/profile".into())
        );
        assert_eq!(
            RoutePattern::parse("/vehicles/*").unwrap(),
            RoutePattern::Prefix("/vehicles".into())
        );
        assert_eq!(
            RoutePattern::parse(r"re:^/vehicles/\d+$").unwrap().kind(),
            RouteKind::Pattern
        );
    }

    #[test]
    fn exact_pattern_drops_trailing_slash() {
        assert_eq!(
            RoutePattern::parse("/ratings/").unwrap(),
            RoutePattern::Exact("/ratings".into())
        );
        assert_eq!(RoutePattern::parse("/").unwrap(), RoutePattern::Exact("/".into()));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert!(RoutePattern::parse("users").is_err());
        assert!(RoutePattern::parse("/*").is_err());
        assert!(RoutePattern::parse("/a/*/b").is_err());
        assert!(RoutePattern::parse("re:").is_err());
    }

    #[test]
    fn regex_literal_base_stops_at_segment_boundary() {
        let p = RoutePattern::parse(r"re:^/ratings/user/(?P<user_id>[^/]+)$").unwrap();
        assert_eq!(p.literal_base().as_deref(), Some("/ratings/user"));
        assert_eq!(p.top_level_segment().as_deref(), Some("ratings"));

        let partial = RoutePattern::parse("re:^/rat[a-z]+").unwrap();
        assert_eq!(partial.literal_base(), None);

        let anchored = RoutePattern::parse("re:^/health$").unwrap();
        assert_eq!(anchored.literal_base().as_deref(), Some("/health"));
    }

    #[test]
    fn top_level_segment_of_literal_patterns() {
        let p = RoutePattern::parse("/auth/forgot-password").unwrap();
        assert_eq!(p.top_level_segment().as_deref(), Some("auth"));
        assert_eq!(RoutePattern::parse("/").unwrap().top_level_segment(), None);
    }

    #[test]
    fn placeholders_are_extracted_in_order() {
        assert_eq!(template_placeholders("/a/{x}/b/{path}"), vec!["x", "path"]);
        assert!(template_placeholders("/plain").is_empty());
    }

    #[test]
    fn method_overlap_treats_empty_as_all() {
        let any = RouteRule::new("a", "/a", "b", "/a");
        let get = RouteRule::new("g", "/a", "b", "/a").with_methods(vec![HttpMethod::Get]);
        let post = RouteRule::new("p", "/a", "b", "/a").with_methods(vec![HttpMethod::Post]);
        assert!(any.methods_overlap(&get));
        assert!(!get.methods_overlap(&post));
        assert!(get.accepts(&HttpMethod::Get));
        assert!(!get.accepts(&HttpMethod::Delete));
    }

    #[test]
    fn rewrite_placeholders_are_checked_against_pattern_kind() {
        let exact = RouteRule::new("e", "/users/profile", "users", "/users/{path}");
        assert!(matches!(exact.validate(), Err(GatewayError::InvalidRewrite(..))));

        let regex = RouteRule::new("r", r"re:^/ratings/user/(?P<user_id>\d+)$", "ratings", "/user/{id}");
        assert!(matches!(regex.validate(), Err(GatewayError::InvalidRewrite(..))));

        let bad_regex = RouteRule::new("r", "re:^/ratings/(", "ratings", "/");
        assert!(matches!(bad_regex.validate(), Err(GatewayError::InvalidPathPattern(..))));

        let ok = RouteRule::new("v", "/vehicles/*", "vehicles", "/vehicles/{path}");
        assert_eq!(ok.validate().unwrap(), RoutePattern::Prefix("/vehicles".into()));
    }
}
