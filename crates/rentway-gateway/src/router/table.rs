//! Precedence-table router implementing [`GatewayRouter`].
//!
//! Rules are kept in evaluation order: all exact rules, then all prefix
//! rules (longest literal base first), then all regex rules.  Inside a tier
//! registration order decides.  Resolution is a linear scan; the first rule
//! whose pattern matches and whose method list accepts the request wins, so
//! a method mismatch simply falls through to the next candidate.

use regex::Regex;
use rentway_kernel::router::{RoutePattern, WILDCARD_PARAM};
use rentway_kernel::{GatewayError, GatewayRouter, HttpMethod, RouteKind, RouteMatch, RouteRule};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Compiled form of a rule's pattern.
enum Matcher {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

struct CompiledRoute {
    rule: RouteRule,
    matcher: Matcher,
}

impl CompiledRoute {
    fn compile(rule: RouteRule) -> Result<Self, GatewayError> {
        let matcher = match rule.parsed_pattern()? {
            RoutePattern::Exact(path) => Matcher::Exact(path),
            RoutePattern::Prefix(base) => Matcher::Prefix(base),
            RoutePattern::Regex(source) => Matcher::Regex(
                Regex::new(&source)
                    .map_err(|e| GatewayError::InvalidPathPattern(rule.id.clone(), e.to_string()))?,
            ),
        };
        Ok(Self { rule, matcher })
    }

    /// `(tier, longest-prefix-first)` evaluation key.
    fn sort_key(&self) -> (RouteKind, Reverse<usize>) {
        match &self.matcher {
            Matcher::Exact(_) => (RouteKind::Exact, Reverse(0)),
            Matcher::Prefix(base) => (RouteKind::Prefix, Reverse(base.len())),
            Matcher::Regex(_) => (RouteKind::Pattern, Reverse(0)),
        }
    }

    /// Captured parameters when `path` matches this rule's pattern.
    fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        match &self.matcher {
            Matcher::Exact(literal) => (normalize(path) == literal).then(HashMap::new),
            Matcher::Prefix(base) => {
                let rest = path.strip_prefix(base.as_str())?;
                let remainder = if rest.is_empty() {
                    ""
                } else {
                    rest.strip_prefix('/')?
                };
                Some(HashMap::from([(
                    WILDCARD_PARAM.to_string(),
                    remainder.to_string(),
                )]))
            }
            Matcher::Regex(regex) => {
                let caps = regex.captures(path)?;
                Some(
                    regex
                        .capture_names()
                        .flatten()
                        .filter_map(|name| {
                            caps.name(name)
                                .map(|m| (name.to_string(), m.as_str().to_string()))
                        })
                        .collect(),
                )
            }
        }
    }
}

/// Trailing separators are not significant for exact rules.
fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// Fill `{name}` placeholders in `template` from `params`.  Unknown names
/// expand to the empty string.
pub(crate) fn expand_template(template: &str, params: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                if let Some(value) = params.get(&after[..close]) {
                    out.push_str(value);
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// [`GatewayRouter`] implementation over a precedence-ordered rule table.
#[derive(Default)]
pub struct TableRouter {
    /// Routes in evaluation order.
    routes: Vec<CompiledRoute>,
}

impl TableRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl GatewayRouter for TableRouter {
    fn register(&mut self, route: RouteRule) -> Result<(), GatewayError> {
        if self.routes.iter().any(|r| r.rule.id == route.id) {
            return Err(GatewayError::DuplicateRoute(route.id));
        }
        let compiled = CompiledRoute::compile(route)?;
        // Insert after every entry with an equal key so registration order
        // is kept inside a tier.
        let key = compiled.sort_key();
        let pos = self.routes.partition_point(|r| r.sort_key() <= key);
        self.routes.insert(pos, compiled);
        Ok(())
    }

    fn resolve(&self, path: &str, method: &HttpMethod) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            if !route.rule.accepts(method) {
                return None;
            }
            let path_params = route.captures(path)?;
            Some(RouteMatch {
                route_id: route.rule.id.clone(),
                backend_id: route.rule.backend_id.clone(),
                downstream_path: expand_template(&route.rule.rewrite, &path_params),
                path_params,
                timeout_ms: route.rule.timeout_ms,
            })
        })
    }

    fn routes(&self) -> Vec<&RouteRule> {
        self.routes.iter().map(|r| &r.rule).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
