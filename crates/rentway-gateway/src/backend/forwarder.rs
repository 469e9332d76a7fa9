//! Reverse-proxy forwarder.
//!
//! [`HttpForwarder`] relays a routed [`GatewayRequest`] to its backend over a
//! shared `reqwest` connection pool and materializes the reply as a
//! [`GatewayResponse`].  The upstream status and body are copied verbatim;
//! only hop-by-hop and length-framing headers are rewritten.

use crate::error::{ProxyError, ProxyResult};
use http::header::{
    ACCEPT_ENCODING, CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, HOST, TRANSFER_ENCODING,
};
use http::{HeaderMap, HeaderName, Method};
use rentway_kernel::{BackendDescriptor, GatewayRequest, GatewayResponse, HttpMethod, RouteMatch};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument};

/// Request headers never relayed upstream.  `accept-encoding` is negotiated
/// by the outbound client, which decodes the body before it is copied back.
const DROPPED_REQUEST_HEADERS: [HeaderName; 5] =
    [HOST, CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION, ACCEPT_ENCODING];

/// Response headers recomputed by the inbound transport.
const DROPPED_RESPONSE_HEADERS: [HeaderName; 4] =
    [CONTENT_ENCODING, TRANSFER_ENCODING, CONTENT_LENGTH, CONNECTION];

/// Forwards requests to backend microservices.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client,
    default_timeout: Duration,
}

impl HttpForwarder {
    /// Build a forwarder whose calls are bounded by `default_timeout` unless
    /// the matched route overrides it.
    pub fn new(default_timeout: Duration) -> ProxyResult<Self> {
        let client = Client::builder()
            .timeout(default_timeout)
            // 3xx answers belong to the caller, not to the gateway.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            default_timeout,
        })
    }

    /// Outbound timeout that applies to `route`.
    pub fn timeout_for(&self, route: &RouteMatch) -> Duration {
        match route.timeout_ms {
            0 => self.default_timeout,
            ms => Duration::from_millis(ms),
        }
    }

    /// Relay `req` to `backend` at the downstream path chosen by `route`.
    #[instrument(
        skip_all,
        fields(request_id = %req.id, backend = %backend.id, route = %route.route_id)
    )]
    pub async fn forward(
        &self,
        backend: &BackendDescriptor,
        route: &RouteMatch,
        req: &GatewayRequest,
    ) -> ProxyResult<GatewayResponse> {
        let url = backend.url_for(&route.downstream_path, req.query.as_deref());
        let timeout = self.timeout_for(route);
        debug!(url = %url, method = req.method.as_str(), "forwarding to backend");

        let method = to_http_method(req.method)?;
        let start = Instant::now();
        let mut builder = self
            .client
            .request(method, &url)
            .headers(outbound_headers(&req.headers))
            .timeout(timeout);
        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        let upstream = builder
            .send()
            .await
            .map_err(|e| transport_error(backend, &url, timeout, e))?;

        let status = upstream.status().as_u16();
        let headers = inbound_headers(upstream.headers());
        let body = upstream
            .bytes()
            .await
            .map_err(|e| transport_error(backend, &url, timeout, e))?;

        let mut resp = GatewayResponse::new(status, &backend.id).with_body(body);
        resp.headers = headers;
        resp.latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(status, latency_ms = resp.latency_ms, "backend replied");
        Ok(resp)
    }
}

fn to_http_method(method: HttpMethod) -> ProxyResult<Method> {
    Method::from_bytes(method.as_str().as_bytes())
        .map_err(|e| ProxyError::ForwardFailed(format!("unsupported method {method}: {e}")))
}

/// Copy of the inbound headers minus the hop-specific ones.
fn outbound_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in &DROPPED_REQUEST_HEADERS {
        out.remove(name);
    }
    out
}

/// Copy of the backend headers minus the length-framing ones.
fn inbound_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in &DROPPED_RESPONSE_HEADERS {
        out.remove(name);
    }
    out
}

/// Translate a `reqwest` failure into the gateway taxonomy.
fn transport_error(
    backend: &BackendDescriptor,
    url: &str,
    timeout: Duration,
    err: reqwest::Error,
) -> ProxyError {
    if err.is_builder() {
        error!(backend = %backend.id, url = %url, error = %err, "could not build backend request");
        return ProxyError::ForwardFailed(format!("invalid request for backend '{}'", backend.id));
    }
    let reason = if err.is_timeout() {
        format!("timed out after {}ms", timeout.as_millis())
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        "request failed".to_string()
    };
    error!(
        backend = %backend.id,
        url = %url,
        error = %err,
        reason = %reason,
        "backend unavailable"
    );
    ProxyError::BackendUnavailable {
        backend_id: backend.id.clone(),
        reason,
    }
}
