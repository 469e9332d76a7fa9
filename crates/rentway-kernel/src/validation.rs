//! Gateway configuration container and startup validation.
//!
//! [`GatewayConfig`] aggregates routes, backends and the cross-cutting
//! policies (rate limit, auth gate, CORS) and exposes a single
//! [`validate()`](GatewayConfig::validate) that checks all structural
//! invariants *before* any runtime resources are allocated.  The config is
//! immutable once validated; each runtime component borrows its slice.

use super::backend::BackendDescriptor;
use super::error::GatewayError;
use super::router::{RoutePattern, RouteRule};
use std::collections::{HashMap, HashSet};

// ─────────────────────────────────────────────────────────────────────────────
// RateLimitConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Sliding-window rate-limit parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per client within any trailing window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Paths (exact) that are never counted.
    pub exempt_paths: Vec<String>,
}

impl RateLimitConfig {
    /// Create a new rate-limit config with the default exempt paths.
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
            exempt_paths: vec!["/api/health".to_string(), "/".to_string()],
        }
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.max_requests == 0 || self.window_secs == 0 {
            return Err(GatewayError::InvalidRateLimit);
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(100, 60)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuthConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Public-path table for the auth gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Paths reachable without a credential, together with their sub-paths.
    pub public_paths: Vec<String>,
    /// Regex sources for parametric public paths.
    pub public_patterns: Vec<String>,
    /// Header whose presence marks a request as carrying a credential.
    pub credential_header: String,
}

impl AuthConfig {
    /// Builder: append extra public paths (e.g. from `PUBLIC_API_PATHS`).
    pub fn with_public_paths(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.public_paths.extend(paths);
        self
    }

    fn validate(&self) -> Result<(), GatewayError> {
        for path in &self.public_paths {
            if !path.starts_with('/') {
                return Err(GatewayError::InvalidPublicPath(
                    path.clone(),
                    "must start with '/'".to_string(),
                ));
            }
        }
        for pattern in &self.public_patterns {
            regex::Regex::new(pattern)
                .map_err(|e| GatewayError::InvalidPublicPath(pattern.clone(), e.to_string()))?;
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_paths: [
                "/",
                "/health",
                "/info",
                "/auth/login",
                "/auth/register",
                "/auth/forgot-password",
                "/vehicles",
                "/rentals/availability",
                "/uploads",
                "/api/health",
                "/api/check-file",
                "/api/serve-file",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            public_patterns: vec![r"^/vehicles/\d+$".to_string()],
            credential_header: "authorization".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CorsConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Cross-origin policy applied to every response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorsConfig {
    /// Origins echoed back verbatim.  The first entry is the pinned fallback
    /// when `permissive_fallback` is off.
    pub allowed_origins: Vec<String>,
    /// Echo any origin (development) instead of pinning the first allowed one.
    pub permissive_fallback: bool,
}

impl CorsConfig {
    /// Create a CORS policy.
    pub fn new(allowed_origins: Vec<String>, permissive_fallback: bool) -> Self {
        Self {
            allowed_origins,
            permissive_fallback,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level gateway configuration.
///
/// Call [`validate()`](Self::validate) to check all structural invariants
/// before passing this config to the gateway runtime.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Unique identifier for this gateway instance.
    pub id: String,
    /// All route definitions, in registration order.
    pub routes: Vec<RouteRule>,
    /// All registered backend descriptors.
    pub backends: Vec<BackendDescriptor>,
    /// Global default outbound request timeout in milliseconds (must be > 0).
    pub request_timeout_ms: u64,
    /// Rate-limit policy.
    pub rate_limit: RateLimitConfig,
    /// Auth gate policy.
    pub auth: AuthConfig,
    /// CORS policy.
    pub cors: CorsConfig,
    /// Paths served by the gateway itself; no route may overlap them.
    pub reserved_paths: Vec<String>,
}

impl GatewayConfig {
    /// Construct a minimal config with only a gateway id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            routes: Vec::new(),
            backends: Vec::new(),
            request_timeout_ms: 30_000,
            rate_limit: RateLimitConfig::default(),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            reserved_paths: Vec::new(),
        }
    }

    /// Builder: add a route.
    pub fn with_route(mut self, route: RouteRule) -> Self {
        self.routes.push(route);
        self
    }

    /// Builder: add a backend.
    pub fn with_backend(mut self, backend: BackendDescriptor) -> Self {
        self.backends.push(backend);
        self
    }

    /// Builder: set the global request timeout.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// Builder: set the rate-limit config.
    pub fn with_rate_limit(mut self, rl: RateLimitConfig) -> Self {
        self.rate_limit = rl;
        self
    }

    /// Builder: set the auth gate config.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Builder: set the CORS config.
    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    /// Builder: declare paths the gateway serves itself.
    pub fn with_reserved_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.reserved_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate all structural invariants of this configuration.
    ///
    /// Returns the *first* detected [`GatewayError`].
    ///
    /// Checks performed (in order):
    /// 1. Gateway id is non-empty.
    /// 2. At least one route and one backend are defined.
    /// 3. Global `request_timeout_ms` is non-zero.
    /// 4. Each backend is well-formed and ids are unique.
    /// 5. Each route is well-formed, ids are unique and the backend exists.
    /// 6. No two routes share a pattern for overlapping methods.
    /// 7. No top-level path segment is claimed by two backends.
    /// 8. No route overlaps a reserved gateway path.
    /// 9. The rate limit and auth gate configs are well-formed.
    pub fn validate(&self) -> Result<(), GatewayError> {
        // ── 1. Gateway id ────────────────────────────────────────────────────
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyGatewayId);
        }

        // ── 2. At least one route and backend ────────────────────────────────
        if self.routes.is_empty() {
            return Err(GatewayError::NoRoutes);
        }
        if self.backends.is_empty() {
            return Err(GatewayError::NoBackends);
        }

        // ── 3. Global timeout is non-zero ────────────────────────────────────
        if self.request_timeout_ms == 0 {
            return Err(GatewayError::InvalidTimeout);
        }

        // ── 4. Backends ──────────────────────────────────────────────────────
        let mut backend_ids: HashSet<&str> = HashSet::new();
        for backend in &self.backends {
            backend.validate()?;
            if !backend_ids.insert(backend.id.as_str()) {
                return Err(GatewayError::DuplicateBackend(backend.id.clone()));
            }
        }

        // ── 5. Routes ────────────────────────────────────────────────────────
        let mut route_ids: HashSet<&str> = HashSet::new();
        let mut parsed: Vec<(&RouteRule, RoutePattern)> = Vec::with_capacity(self.routes.len());
        for route in &self.routes {
            let pattern = route.validate()?;
            if !route_ids.insert(route.id.as_str()) {
                return Err(GatewayError::DuplicateRoute(route.id.clone()));
            }
            if !backend_ids.contains(route.backend_id.as_str()) {
                return Err(GatewayError::UnknownBackend(
                    route.id.clone(),
                    route.backend_id.clone(),
                ));
            }
            parsed.push((route, pattern));
        }

        // ── 6. Duplicate patterns ────────────────────────────────────────────
        for (i, (route, pattern)) in parsed.iter().enumerate() {
            if let Some((earlier, _)) = parsed[..i]
                .iter()
                .find(|(other, other_pattern)| other_pattern == pattern && other.methods_overlap(route))
            {
                return Err(GatewayError::DuplicatePattern(earlier.id.clone(), route.id.clone()));
            }
        }

        // ── 7. Top-level prefix ownership ─────────────────────────────────────
        let mut owners: HashMap<String, &str> = HashMap::new();
        for (route, pattern) in &parsed {
            let Some(segment) = pattern.top_level_segment() else {
                continue;
            };
            match owners.get(&segment) {
                Some(owner) if *owner != route.backend_id => {
                    return Err(GatewayError::OverlappingPrefix {
                        prefix: segment,
                        first: owner.to_string(),
                        second: route.backend_id.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    owners.insert(segment, route.backend_id.as_str());
                }
            }
        }

        // ── 8. Reserved paths ─────────────────────────────────────────────────
        for (route, pattern) in &parsed {
            if let Some(reserved) = self
                .reserved_paths
                .iter()
                .find(|reserved| overlaps_reserved(pattern, reserved))
            {
                return Err(GatewayError::ReservedPath(route.id.clone(), reserved.clone()));
            }
        }

        // ── 9. Policies ───────────────────────────────────────────────────────
        self.rate_limit.validate()?;
        self.auth.validate()?;

        Ok(())
    }
}

/// Whether a rule with `pattern` could match a path under `reserved`, or
/// swallow it.
fn overlaps_reserved(pattern: &RoutePattern, reserved: &str) -> bool {
    let Some(base) = pattern.literal_base() else {
        return false;
    };
    let reserved = reserved.trim_end_matches('/');
    let under_reserved = base == reserved || base.starts_with(&format!("{reserved}/"));
    match pattern {
        RoutePattern::Exact(_) => under_reserved,
        RoutePattern::Prefix(_) | RoutePattern::Regex(_) => {
            under_reserved || reserved.starts_with(&format!("{base}/"))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
