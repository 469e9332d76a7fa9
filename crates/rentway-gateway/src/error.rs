//! Request-time error types for the gateway runtime.
//!
//! Every failure a request can hit between the socket and the backend maps
//! to exactly one [`ProxyError`] variant, and every variant maps to exactly
//! one HTTP status.  The JSON body always carries a human-readable `detail`
//! plus a stable machine `code`.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use rentway_kernel::GatewayResponse;
use serde_json::{Value, json};
use thiserror::Error;

/// Gateway runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Too many requests. Please try again later.")]
    RateLimited { limit: u32, window_secs: u64 },

    #[error("No route matches {method} {path}")]
    NoRoute { method: String, path: String },

    #[error("Method '{0}' is not supported")]
    MethodNotSupported(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Service unavailable: backend '{backend_id}' could not be reached ({reason})")]
    BackendUnavailable { backend_id: String, reason: String },

    #[error("Gateway error: {0}")]
    ForwardFailed(String),

    #[error("Invalid file path")]
    InvalidFilePath,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status this error is surfaced as.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::NoRoute { .. } | ProxyError::FileNotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::MethodNotSupported(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::InvalidFilePath => StatusCode::BAD_REQUEST,
            ProxyError::ForwardFailed(_) | ProxyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::Unauthenticated => "AUTHENTICATION_REQUIRED",
            ProxyError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            ProxyError::NoRoute { .. } => "NO_ROUTE",
            ProxyError::MethodNotSupported(_) => "METHOD_NOT_SUPPORTED",
            ProxyError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ProxyError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            ProxyError::ForwardFailed(_) => "FORWARD_FAILED",
            ProxyError::InvalidFilePath => "INVALID_FILE_PATH",
            ProxyError::FileNotFound(_) => "FILE_NOT_FOUND",
            ProxyError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// JSON body sent to the caller.  Internal details never leak.
    pub fn body(&self) -> Value {
        match self {
            ProxyError::RateLimited { limit, window_secs } => json!({
                "detail": self.to_string(),
                "code": self.code(),
                "limit": limit,
                "window_seconds": window_secs,
            }),
            _ => json!({
                "detail": self.to_string(),
                "code": self.code(),
            }),
        }
    }

    /// Render as a locally-produced [`GatewayResponse`] so the error still
    /// flows back through the filter chain.
    pub fn into_gateway_response(self) -> GatewayResponse {
        let mut resp = GatewayResponse::json(self.status().as_u16(), &self.body());
        if let ProxyError::RateLimited { window_secs, .. } = &self {
            resp.headers.insert(RETRY_AFTER, HeaderValue::from(*window_secs));
        }
        resp
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(self.body());
        match self {
            ProxyError::RateLimited { window_secs, .. } => {
                (status, [(RETRY_AFTER, HeaderValue::from(window_secs))], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;

/// Startup and serve-loop failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    #[error("invalid gateway configuration: {0}")]
    Config(#[from] rentway_kernel::GatewayError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
