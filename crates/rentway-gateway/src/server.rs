//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires together the router, backend registry, forwarder,
//! local endpoints and filter pipeline into a running axum service.  A
//! single fallback handler receives every request, so routing precedence
//! lives entirely in the table router and nothing bypasses the pipeline.

use crate::backend::{HttpForwarder, InMemoryBackendRegistry};
use crate::dispatch::Dispatcher;
use crate::error::{ProxyError, ServerError};
use crate::filter::{
    AuthGateFilter, CorsFilter, FilterPipeline, LoggingFilter, REQUEST_ID_HEADER, RateLimitFilter,
};
use crate::handlers::LocalEndpoints;
use crate::limiter::SlidingWindowLimiter;
use crate::router::TableRouter;
use axum::{
    Router,
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, header::ORIGIN},
    response::{IntoResponse, Response},
};
use rentway_kernel::{
    BackendRegistry, GatewayConfig, GatewayContext, GatewayFilter, GatewayRequest,
    GatewayResponse, GatewayRouter, HttpMethod,
};
use std::any::Any;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state injected into the handler via [`State`] extractor.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<FilterPipeline>,
    cors: Arc<CorsFilter>,
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration for [`GatewayServer`].
#[derive(Debug, Clone)]
pub struct GatewayServerConfig {
    /// TCP port to listen on (default: 3000).
    pub port: u16,
    /// Root for `/api/check-file` and `/api/serve-file`.
    pub files_root: PathBuf,
    /// Directory mounted at `/uploads`.
    pub uploads_dir: PathBuf,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for GatewayServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            files_root: PathBuf::from("/app"),
            uploads_dir: PathBuf::from("/app/uploads"),
            max_body_bytes: 50 * 1024 * 1024,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// High-level gateway server encapsulating router, filter pipeline, and
/// backend registry.
pub struct GatewayServer {
    config: GatewayServerConfig,
}

impl GatewayServer {
    /// Create a new server from the given configuration.
    pub fn new(config: GatewayServerConfig) -> Self {
        Self { config }
    }

    /// Build the axum [`Router`] wired to the provided [`GatewayConfig`].
    ///
    /// Validates the config, registers routes and backends, and constructs
    /// the filter pipeline.  Call [`start()`](Self::start) to bind and serve.
    pub fn build_app(&self, gateway_cfg: &GatewayConfig) -> Result<Router, ServerError> {
        self.assemble(gateway_cfg).map(|(app, _)| app)
    }

    fn assemble(
        &self,
        gateway_cfg: &GatewayConfig,
    ) -> Result<(Router, Arc<SlidingWindowLimiter>), ServerError> {
        gateway_cfg.validate()?;

        let mut router = TableRouter::new();
        for route in &gateway_cfg.routes {
            router.register(route.clone())?;
        }

        let mut registry = InMemoryBackendRegistry::new();
        for backend in &gateway_cfg.backends {
            registry.register(backend.clone())?;
        }

        let forwarder = HttpForwarder::new(Duration::from_millis(gateway_cfg.request_timeout_ms))?;
        let local = LocalEndpoints::new(&self.config.files_root, &self.config.uploads_dir);

        let rate_limit = RateLimitFilter::new(&gateway_cfg.rate_limit);
        let limiter = rate_limit.limiter();
        let cors = Arc::new(CorsFilter::new(gateway_cfg.cors.clone()));
        let filters: Vec<Arc<dyn GatewayFilter>> = vec![
            Arc::new(LoggingFilter::new(gateway_cfg.rate_limit.exempt_paths.clone())),
            cors.clone(),
            Arc::new(AuthGateFilter::new(&gateway_cfg.auth)?),
            Arc::new(rate_limit),
        ];
        let pipeline = FilterPipeline::new(filters);

        info!(
            gateway  = %gateway_cfg.id,
            routes   = router.len(),
            backends = registry.list_all().len(),
            filters  = ?pipeline.names(),
            "gateway assembled"
        );

        let state = AppState {
            pipeline: Arc::new(pipeline),
            cors: Arc::clone(&cors),
            dispatcher: Arc::new(Dispatcher::new(local, router, registry, forwarder)),
            max_body_bytes: self.config.max_body_bytes,
        };

        let app = Router::new()
            .fallback(proxy_handler)
            .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
                panic_response(&cors, panic)
            }))
            .with_state(state);
        Ok((app, limiter))
    }

    /// Bind to `0.0.0.0:{port}` and serve until SIGINT/SIGTERM, then drain
    /// in-flight requests.
    pub async fn start(self, gateway_cfg: GatewayConfig) -> Result<(), ServerError> {
        let (app, limiter) = self.assemble(&gateway_cfg)?;

        match tokio::fs::metadata(&self.config.uploads_dir).await {
            Ok(meta) if meta.is_dir() => {
                info!(dir = %self.config.uploads_dir.display(), "serving uploads")
            }
            _ => error!(
                dir = %self.config.uploads_dir.display(),
                "uploads directory not found; /uploads will answer 404"
            ),
        }

        let reaper = limiter.spawn_reaper();
        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %addr, "Rentway gateway listening");

        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        reaper.abort();
        info!("Rentway gateway stopped");
        served.map_err(ServerError::from)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Every request lands here: convert to a [`GatewayRequest`], run the
/// pipeline, convert back.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let (parts, body) = request.into_parts();
    let origin = parts
        .headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let reject = |err: ProxyError| early_response(err, &request_id, &state.cors, origin.as_deref());

    let client_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let Some(method) = HttpMethod::from_http(&parts.method) else {
        warn!(request_id = %request_id, method = %parts.method, "unsupported method");
        return reject(ProxyError::MethodNotSupported(parts.method.to_string()));
    };

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => {
            warn!(request_id = %request_id, error = %err, "request body rejected");
            return reject(ProxyError::PayloadTooLarge(state.max_body_bytes));
        }
    };

    let mut req = GatewayRequest::new(&request_id, method, parts.uri.path())
        .with_body(body)
        .with_client_ip(client_ip);
    if let Some(query) = parts.uri.query() {
        req = req.with_query(query);
    }
    req.headers = parts.headers;

    let mut ctx = GatewayContext::new(req);
    let resp = state.pipeline.execute(&mut ctx, state.dispatcher.as_ref()).await;
    build_axum_response(resp)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Error response for requests rejected before the pipeline could run.
fn early_response(
    err: ProxyError,
    request_id: &str,
    cors: &CorsFilter,
    origin: Option<&str>,
) -> Response {
    let mut resp = err.into_response();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    if let Err(e) = cors.apply(origin, resp.headers_mut()) {
        warn!(request_id = %request_id, error = %e, "could not set CORS headers");
    }
    resp
}

/// Last-resort handler: a panic still yields a well-formed 500.  The
/// request is gone by now, so CORS falls back to the origin-less policy.
fn panic_response(cors: &CorsFilter, panic: Box<dyn Any + Send + 'static>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(request_id = %request_id, panic = %message, "request handler panicked");
    early_response(ProxyError::Internal(message), &request_id, cors, None)
}

fn build_axum_response(resp: GatewayResponse) -> Response {
    let status = resp.status_code();
    let mut out = Response::new(Body::from(resp.body));
    *out.status_mut() = status;
    *out.headers_mut() = resp.headers;
    out
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}
