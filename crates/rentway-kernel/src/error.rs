//! Gateway error types for `rentway-kernel`.
//!
//! [`GatewayError`] covers every failure mode that can be detected at
//! *definition time* — empty IDs, duplicate registrations, missing backend
//! references, overlapping prefixes, invalid configuration values — before
//! any network I/O occurs.  Runtime failures (connection refused, upstream
//! timeout, missing credential, …) belong in `rentway-gateway`.

use thiserror::Error;

/// Configuration-time error type for the gateway kernel contract.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Identity ────────────────────────────────────────────────────────────
    /// The gateway configuration `id` field is empty or whitespace-only.
    #[error("gateway id cannot be empty")]
    EmptyGatewayId,

    // ── Routes ───────────────────────────────────────────────────────────────
    /// The configuration contains no routes.
    #[error("gateway config must define at least one route")]
    NoRoutes,

    /// A route `id` field is empty or whitespace-only.
    #[error("route id cannot be empty")]
    EmptyRouteId,

    /// A route with this id has already been registered.
    #[error("route '{0}' is already registered")]
    DuplicateRoute(String),

    /// A route references a backend id that is not present in the backend list.
    #[error("route '{0}' references unknown backend '{1}'")]
    UnknownBackend(String, String),

    /// A route path pattern is syntactically invalid.
    #[error("route '{0}' has an invalid path pattern: {1}")]
    InvalidPathPattern(String, String),

    /// A route rewrite template is invalid for its pattern kind.
    #[error("route '{0}' has an invalid rewrite template: {1}")]
    InvalidRewrite(String, String),

    /// Two routes declare the same pattern for overlapping methods.
    #[error("routes '{0}' and '{1}' register the same pattern for overlapping methods")]
    DuplicatePattern(String, String),

    /// Two different backends claim the same top-level path prefix.
    #[error("top-level prefix '/{prefix}' is claimed by both backend '{first}' and backend '{second}'")]
    OverlappingPrefix {
        prefix: String,
        first: String,
        second: String,
    },

    /// A route would shadow, or be shadowed by, a path the gateway serves itself.
    #[error("route '{0}' collides with reserved gateway path '{1}'")]
    ReservedPath(String, String),

    // ── Backends ─────────────────────────────────────────────────────────────
    /// The configuration contains no backends.
    #[error("gateway config must define at least one backend")]
    NoBackends,

    /// A backend `id` field is empty or whitespace-only.
    #[error("backend id cannot be empty")]
    EmptyBackendId,

    /// A backend with this id has already been registered.
    #[error("backend '{0}' is already registered")]
    DuplicateBackend(String),

    /// A backend base URL or path prefix is syntactically invalid.
    #[error("backend '{0}' has an invalid endpoint: {1}")]
    InvalidEndpoint(String, String),

    // ── Auth ─────────────────────────────────────────────────────────────────
    /// A public-path entry or pattern is malformed.
    #[error("invalid public path '{0}': {1}")]
    InvalidPublicPath(String, String),

    // ── Timeouts / rate-limits ────────────────────────────────────────────────
    /// `request_timeout_ms` is zero, which would reject every request.
    #[error("request timeout must be greater than 0 ms")]
    InvalidTimeout,

    /// The rate-limit quota or window is zero.
    #[error("rate limit max_requests and window_secs must both be greater than 0")]
    InvalidRateLimit,

    // ── Filters ──────────────────────────────────────────────────────────────
    /// A filter failed while processing a request or response.
    #[error("filter '{0}' failed: {1}")]
    Filter(String, String),
}
