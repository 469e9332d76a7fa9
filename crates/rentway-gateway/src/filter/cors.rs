//! CORS filter.
//!
//! Answers browser preflights directly and decorates every response with
//! the access-control headers computed from the request's `Origin`, so
//! local rejections (401, 429, 503) stay readable from the frontend.

use async_trait::async_trait;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use http::header::InvalidHeaderValue;
use http::{HeaderMap, HeaderValue};
use rentway_kernel::{
    CorsConfig, FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter,
    GatewayResponse, HttpMethod,
};

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS";
const DEFAULT_ALLOWED_HEADERS: &str = "authorization, content-type, x-request-id";
const EXPOSED_HEADERS: &str = "x-request-id, retry-after";
const PREFLIGHT_MAX_AGE_SECS: &str = "600";

/// CORS filter.
pub struct CorsFilter {
    config: CorsConfig,
}

impl CorsFilter {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// `Access-Control-Allow-Origin` value for a request carrying `origin`.
    pub fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        if let Some(origin) = origin {
            if self.config.allowed_origins.iter().any(|o| o == origin) {
                return Some(origin.to_string());
            }
        }
        if self.config.permissive_fallback {
            return Some(origin.unwrap_or("*").to_string());
        }
        self.config.allowed_origins.first().cloned()
    }

    /// Replace any access-control headers in `headers` with the gateway's
    /// own for a request carrying `origin`.
    pub fn apply(
        &self,
        origin: Option<&str>,
        headers: &mut HeaderMap,
    ) -> Result<(), InvalidHeaderValue> {
        headers.remove(ACCESS_CONTROL_ALLOW_ORIGIN);
        headers.remove(ACCESS_CONTROL_ALLOW_CREDENTIALS);
        headers.remove(ACCESS_CONTROL_EXPOSE_HEADERS);

        let Some(origin) = self.allow_origin(origin) else {
            return Ok(());
        };
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_str(&origin)?);
        if origin != "*" {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
        headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static(EXPOSED_HEADERS));
        Ok(())
    }

    fn is_preflight(ctx: &GatewayContext) -> bool {
        ctx.request.method == HttpMethod::Options
            && ctx.request.headers.contains_key(ORIGIN)
            && ctx.request.headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
    }
}

#[async_trait]
impl GatewayFilter for CorsFilter {
    fn name(&self) -> &str {
        "cors"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::CORS
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        if !Self::is_preflight(ctx) {
            return Ok(FilterAction::Continue);
        }
        let allow_headers = ctx
            .request
            .headers
            .get(ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned()
            .unwrap_or(HeaderValue::from_static(DEFAULT_ALLOWED_HEADERS));
        let resp = GatewayResponse::new(204, GatewayResponse::LOCAL)
            .with_header(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS))
            .with_header(ACCESS_CONTROL_ALLOW_HEADERS, allow_headers)
            .with_header(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS));
        Ok(FilterAction::Reject(resp))
    }

    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        self.apply(ctx.request.header(ORIGIN.as_str()), &mut resp.headers)
            .map_err(|e| GatewayError::Filter(self.name().to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentway_kernel::GatewayRequest;

    const FRONTEND: &str = "http://frontend:4000";

    fn filter(permissive: bool) -> CorsFilter {
        CorsFilter::new(CorsConfig::new(
            vec![FRONTEND.to_string(), "https://rent.example".to_string()],
            permissive,
        ))
    }

    #[test]
    fn listed_origin_is_echoed() {
        let f = filter(false);
        assert_eq!(f.allow_origin(Some("https://rent.example")).as_deref(), Some("https://rent.example"));
    }

    #[test]
    fn fallback_depends_on_environment() {
        assert_eq!(
            filter(true).allow_origin(Some("http://localhost:5173")).as_deref(),
            Some("http://localhost:5173")
        );
        assert_eq!(filter(true).allow_origin(None).as_deref(), Some("*"));
        assert_eq!(
            filter(false).allow_origin(Some("http://evil.test")).as_deref(),
            Some(FRONTEND)
        );
    }

    #[tokio::test]
    async fn preflight_is_answered_locally() {
        let f = filter(false);
        let mut ctx = GatewayContext::new(
            GatewayRequest::new("r1", HttpMethod::Options, "/rentals/5")
                .with_header("origin", FRONTEND)
                .with_header("access-control-request-method", "DELETE")
                .with_header("access-control-request-headers", "authorization"),
        );
        let FilterAction::Reject(mut resp) = f.on_request(&mut ctx).await.unwrap() else {
            panic!("preflight must be answered by the gateway");
        };
        f.on_response(&ctx, &mut resp).await.unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_HEADERS], "authorization");
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND);
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn plain_options_is_not_a_preflight() {
        let f = filter(false);
        let mut ctx = GatewayContext::new(GatewayRequest::new("r1", HttpMethod::Options, "/rentals/5"));
        assert!(f.on_request(&mut ctx).await.unwrap().is_continue());
    }

    #[tokio::test]
    async fn backend_cors_headers_are_replaced() {
        let f = filter(true);
        let ctx = GatewayContext::new(
            GatewayRequest::new("r1", HttpMethod::Get, "/vehicles").with_header("origin", FRONTEND),
        );
        let mut resp = GatewayResponse::new(200, "vehicles")
            .with_header(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        f.on_response(&ctx, &mut resp).await.unwrap();
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND);
        assert_eq!(resp.headers[ACCESS_CONTROL_EXPOSE_HEADERS], EXPOSED_HEADERS);
    }

    #[tokio::test]
    async fn wildcard_origin_never_allows_credentials() {
        let f = filter(true);
        let ctx = GatewayContext::new(GatewayRequest::new("r1", HttpMethod::Get, "/vehicles"));
        let mut resp = GatewayResponse::new(200, "vehicles");
        f.on_response(&ctx, &mut resp).await.unwrap();
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(resp.headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }
}
