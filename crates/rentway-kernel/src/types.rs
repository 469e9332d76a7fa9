//! Core data types for the gateway kernel contract.
//!
//! These types are shared across all gateway traits
//! ([`GatewayRouter`](super::router::GatewayRouter),
//! [`GatewayFilter`](super::filter::GatewayFilter),
//! [`BackendRegistry`](super::backend::BackendRegistry)).
//! Headers use [`http::HeaderMap`] so repeated header names survive the trip
//! through the pipeline in order.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method, covering the standard verbs used in REST and proxy scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[non_exhaustive]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Convert from an [`http::Method`].
    ///
    /// Returns `None` for methods outside this enum (e.g. `CONNECT`,
    /// `TRACE`, extension methods).
    pub fn from_http(method: &http::Method) -> Option<Self> {
        Self::from_str_ci(method.as_str())
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────────────────

/// An inbound request flowing through the gateway.
///
/// All fields use owned types so the struct can be moved across async task
/// boundaries without lifetime complications.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Correlation identifier, unique per inbound request.
    pub id: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path without the query string, e.g. `/vehicles/12`.
    pub path: String,
    /// Raw query string (without `?`), forwarded verbatim.
    pub query: Option<String>,
    /// Inbound headers, multi-valued by name.
    pub headers: HeaderMap,
    /// Raw body bytes.
    pub body: Bytes,
    /// Network address of the caller, `"unknown"` when not available.
    pub client_ip: String,
}

impl GatewayRequest {
    /// Construct a minimal request with the given id, method and path.
    pub fn new(id: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_ip: "unknown".to_string(),
        }
    }

    /// Builder helper: append a header (existing values for `name` are kept).
    ///
    /// Invalid header names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Builder helper: set the raw query string.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder helper: set the caller address.
    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.client_ip = client_ip.into();
        self
    }

    /// First value of header `name` as UTF-8, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// An outbound response produced by a backend (or by the gateway itself) and
/// returned through the filter chain.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// HTTP status code (100–599).
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body bytes.
    pub body: Bytes,
    /// Id of the backend that generated this response (`"gateway"` for
    /// responses produced locally).
    pub backend_id: String,
    /// Round-trip latency in milliseconds.
    pub latency_ms: u64,
}

impl GatewayResponse {
    /// Backend id used for responses the gateway produces itself.
    pub const LOCAL: &'static str = "gateway";

    /// Construct a minimal response.
    pub fn new(status: u16, backend_id: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            backend_id: backend_id.into(),
            latency_ms: 0,
        }
    }

    /// Construct a locally-produced JSON response.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        let mut resp = Self::new(status, Self::LOCAL).with_body(value.to_string());
        resp.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        resp
    }

    /// Builder helper: set a header, replacing any previous values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Status as an [`http::StatusCode`], falling back to 500 for values
    /// outside the valid range.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Route match
// ─────────────────────────────────────────────────────────────────────────────

/// The result of a successful route lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    /// Id of the matched route.
    pub route_id: String,
    /// Id of the backend this route targets.
    pub backend_id: String,
    /// Downstream path after applying the rule's rewrite template
    /// (relative to the backend's base URL and path prefix).
    pub downstream_path: String,
    /// Values captured while matching (`path` for wildcard tails, named
    /// groups for regex rules).
    pub path_params: HashMap<String, String>,
    /// Configured timeout for this route in milliseconds (`0` = default).
    pub timeout_ms: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request context
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable context that flows through the filter chain for a single request.
///
/// Filters read from and write to this context, enabling later filters to
/// access decisions made by earlier ones (e.g. the start time recorded by
/// the logging filter, or the dispatch error recorded by the pipeline).
#[derive(Debug, Clone)]
pub struct GatewayContext {
    /// The inbound request.
    pub request: GatewayRequest,
    /// Populated after routing; `None` if the request was not proxied.
    pub route_match: Option<RouteMatch>,
    /// Free-form attributes written and read by filters.
    pub attributes: HashMap<String, serde_json::Value>,
}

impl GatewayContext {
    /// Attribute key under which the pipeline records a dispatch failure.
    pub const ERROR_ATTR: &'static str = "pipeline.error";

    /// Create a fresh context from an inbound request.
    pub fn new(request: GatewayRequest) -> Self {
        Self {
            request,
            route_match: None,
            attributes: HashMap::new(),
        }
    }

    /// Convenience: read a typed attribute, returning `None` if absent or
    /// if deserialization fails.
    pub fn get_attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Convenience: write a serializable attribute.
    pub fn set_attr<T: serde::Serialize>(&mut self, key: impl Into<String>, val: &T) {
        if let Ok(v) = serde_json::to_value(val) {
            self.attributes.insert(key.into(), v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::from_str_ci("patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_str_ci("TRACE"), None);
        assert_eq!(HttpMethod::from_http(&http::Method::OPTIONS), Some(HttpMethod::Options));
    }

    #[test]
    fn request_headers_keep_repeated_values() {
        let req = GatewayRequest::new("r1", HttpMethod::Get, "/users")
            .with_header("Accept", "text/html")
            .with_header("accept", "application/json");
        let values: Vec<_> = req.headers.get_all("accept").iter().collect();
        assert_eq!(values.len(), 2);
        assert_eq!(req.header("accept"), Some("text/html"));
    }

    #[test]
    fn empty_query_is_none() {
        let req = GatewayRequest::new("r1", HttpMethod::Get, "/users").with_query("");
        assert!(req.query.is_none());
    }

    #[test]
    fn json_response_sets_content_type() {
        let resp = GatewayResponse::json(401, &serde_json::json!({ "detail": "nope" }));
        assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers[CONTENT_TYPE], "application/json");
        assert_eq!(resp.backend_id, GatewayResponse::LOCAL);
    }

    #[test]
    fn context_attributes_round_trip_typed_values() {
        let mut ctx = GatewayContext::new(GatewayRequest::new("r1", HttpMethod::Get, "/"));
        ctx.set_attr("start", &42_u64);
        assert_eq!(ctx.get_attr::<u64>("start"), Some(42));
        assert_eq!(ctx.get_attr::<String>("start"), None);
    }
}
