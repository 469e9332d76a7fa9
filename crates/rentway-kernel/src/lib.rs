//! Gateway kernel contract for the Rentway API gateway.
//!
//! This crate defines the *trait interfaces, data types and configuration
//! validation* for the gateway.  No network I/O lives here — concrete
//! implementations belong in `rentway-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              rentway-kernel  (this crate)                   │
//! │  GatewayRouter trait    BackendRegistry trait               │
//! │  GatewayFilter trait    GatewayConfig + validate()          │
//! │  GatewayRequest/Response/Context  GatewayError              │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              rentway-gateway  (runtime crate)               │
//! │  TableRouter: impl GatewayRouter                            │
//! │  InMemoryBackendRegistry: impl BackendRegistry              │
//! │  Logging / Cors / AuthGate / RateLimit filters              │
//! │  HttpForwarder (reqwest)   GatewayServer (axum)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use rentway_kernel::{BackendDescriptor, GatewayConfig, RouteRule};
//!
//! let config = GatewayConfig::new("rental-gateway")
//!     .with_backend(BackendDescriptor::new("users", "http://user-service:3001"))
//!     .with_route(RouteRule::new("users", "/users/*", "users", "/users/{path}"));
//!
//! config.validate().expect("gateway config is valid");
//! ```

pub mod backend;
pub mod error;
pub mod filter;
pub mod router;
pub mod types;
pub mod validation;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use backend::{BackendDescriptor, BackendRegistry};
pub use error::GatewayError;
pub use filter::{FilterAction, FilterOrder, GatewayFilter};
pub use router::{GatewayRouter, RouteKind, RoutePattern, RouteRule};
pub use types::{GatewayContext, GatewayRequest, GatewayResponse, HttpMethod, RouteMatch};
pub use validation::{AuthConfig, CorsConfig, GatewayConfig, RateLimitConfig};
