//! `rentway-gateway` — HTTP API gateway for the Rentway car-rental platform.
//!
//! This crate provides the concrete implementations of the contracts defined
//! in `rentway-kernel`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`GatewayRouter`](kernel::GatewayRouter) | [`router::TableRouter`] |
//! | [`BackendRegistry`](kernel::BackendRegistry) | [`backend::InMemoryBackendRegistry`] |
//! | [`GatewayFilter`](kernel::GatewayFilter) | [`filter::LoggingFilter`], [`filter::CorsFilter`], [`filter::AuthGateFilter`], [`filter::RateLimitFilter`] |
//!
//! Admitted requests are either answered by [`handlers::LocalEndpoints`]
//! (health, file checks, uploads) or forwarded by
//! [`backend::HttpForwarder`].  [`server::GatewayServer`] wires everything
//! together into an axum HTTP service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use rentway_gateway::server::GatewayServer;
//! use rentway_gateway::settings::Settings;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Settings::load().expect("settings");
//!     let server = GatewayServer::new(settings.server_config());
//!     server.start(settings.gateway_config()).await.unwrap();
//! }
//! ```

pub mod backend;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod limiter;
pub mod router;
pub mod routes;
pub mod server;
pub mod settings;

// Re-export the kernel types for convenience.
pub use rentway_kernel as kernel;
