//! Correlation and access-logging filter.
//!
//! Outermost stage.  Emits a `tracing` event when a request enters and when
//! its response leaves, picks the severity from the final status, and stamps
//! the request's correlation id on every response, including rejections and
//! error responses produced further in.

use async_trait::async_trait;
use http::{HeaderName, HeaderValue};
use rentway_kernel::{
    FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, GatewayResponse,
};
use std::collections::HashSet;
use tracing::{Level, debug, error, info, warn};

/// Response header carrying the correlation id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const START_ATTR: &str = "log.request_start_ms";

/// Logging filter — records inbound requests and outbound responses.
pub struct LoggingFilter {
    /// Paths (exact) logged at debug level only, e.g. health checks.
    quiet_paths: HashSet<String>,
}

impl LoggingFilter {
    pub fn new(quiet_paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            quiet_paths: quiet_paths.into_iter().map(Into::into).collect(),
        }
    }

    fn is_quiet(&self, path: &str) -> bool {
        self.quiet_paths.contains(path)
    }

    /// Level of the completion event: 5xx error, 4xx warning, quiet paths
    /// debug, everything else info.
    fn severity(&self, path: &str, status: u16) -> Level {
        match status {
            500.. => Level::ERROR,
            400..=499 => Level::WARN,
            _ if self.is_quiet(path) => Level::DEBUG,
            _ => Level::INFO,
        }
    }
}

impl Default for LoggingFilter {
    fn default() -> Self {
        Self::new(["/api/health", "/"])
    }
}

#[async_trait]
impl GatewayFilter for LoggingFilter {
    fn name(&self) -> &str {
        "access-log"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::LOGGING
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        let req = &ctx.request;
        if self.is_quiet(&req.path) {
            debug!(
                request_id = %req.id,
                method     = req.method.as_str(),
                path       = %req.path,
                client_ip  = %req.client_ip,
                "→ request started"
            );
        } else {
            info!(
                request_id = %req.id,
                method     = req.method.as_str(),
                path       = %req.path,
                client_ip  = %req.client_ip,
                "→ request started"
            );
        }
        ctx.set_attr(START_ATTR, &now_ms());
        Ok(FilterAction::Continue)
    }

    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        let start_ms: u64 = ctx.get_attr(START_ATTR).unwrap_or(0);
        let elapsed = now_ms().saturating_sub(start_ms);
        let req = &ctx.request;
        let cause = ctx
            .get_attr::<String>(GatewayContext::ERROR_ATTR)
            .unwrap_or_default();
        let route = ctx
            .route_match
            .as_ref()
            .map_or("-", |m| m.route_id.as_str());

        let level = self.severity(&req.path, resp.status);
        if level == Level::ERROR {
            error!(
                request_id = %req.id,
                method     = req.method.as_str(),
                path       = %req.path,
                route,
                status     = resp.status,
                backend    = %resp.backend_id,
                latency_ms = elapsed,
                error      = %cause,
                "← request failed"
            );
        } else if level == Level::WARN {
            warn!(
                request_id = %req.id,
                method     = req.method.as_str(),
                path       = %req.path,
                route,
                status     = resp.status,
                backend    = %resp.backend_id,
                latency_ms = elapsed,
                error      = %cause,
                "← request rejected"
            );
        } else if level == Level::DEBUG {
            debug!(
                request_id = %req.id,
                path       = %req.path,
                status     = resp.status,
                latency_ms = elapsed,
                "← request completed"
            );
        } else {
            info!(
                request_id         = %req.id,
                method             = req.method.as_str(),
                path               = %req.path,
                route,
                status             = resp.status,
                backend            = %resp.backend_id,
                backend_latency_ms = resp.latency_ms,
                latency_ms         = elapsed,
                "← request completed"
            );
        }

        if let Ok(value) = HeaderValue::from_str(&req.id) {
            resp.headers.insert(REQUEST_ID_HEADER, value);
        }
        resp.latency_ms = elapsed;
        Ok(())
    }
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentway_kernel::{GatewayRequest, HttpMethod};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[tokio::test]
    async fn stamps_request_id_on_response() {
        let filter = LoggingFilter::default();
        let mut ctx = GatewayContext::new(GatewayRequest::new("req-42", HttpMethod::Get, "/vehicles"));
        filter.on_request(&mut ctx).await.unwrap();
        assert!(ctx.get_attr::<u64>(START_ATTR).is_some());

        let mut resp = GatewayResponse::new(200, "vehicles");
        filter.on_response(&ctx, &mut resp).await.unwrap();
        assert_eq!(resp.headers[REQUEST_ID_HEADER], "req-42");
    }

    #[tokio::test]
    async fn error_responses_are_stamped_too() {
        let filter = LoggingFilter::default();
        let mut ctx = GatewayContext::new(GatewayRequest::new("req-7", HttpMethod::Post, "/payments/1"));
        filter.on_request(&mut ctx).await.unwrap();
        ctx.set_attr(GatewayContext::ERROR_ATTR, &"connection failed");

        let mut resp = GatewayResponse::new(503, GatewayResponse::LOCAL);
        filter.on_response(&ctx, &mut resp).await.unwrap();
        assert_eq!(resp.headers[REQUEST_ID_HEADER], "req-7");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn severity_follows_status_class() {
        let filter = LoggingFilter::default();
        assert_eq!(filter.severity("/payments/1", 503), Level::ERROR);
        assert_eq!(filter.severity("/garage/1", 404), Level::WARN);
        assert_eq!(filter.severity("/api/health", 429), Level::WARN);
        assert_eq!(filter.severity("/api/health", 200), Level::DEBUG);
        assert_eq!(filter.severity("/vehicles", 302), Level::INFO);
    }

    #[tokio::test]
    async fn client_errors_with_a_cause_log_as_warnings() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let filter = LoggingFilter::default();
        let mut ctx = GatewayContext::new(GatewayRequest::new("req-9", HttpMethod::Get, "/garage/1"));
        filter.on_request(&mut ctx).await.unwrap();
        ctx.set_attr(GatewayContext::ERROR_ATTR, &"No route matches GET /garage/1");
        let mut resp = GatewayResponse::new(404, GatewayResponse::LOCAL);
        filter.on_response(&ctx, &mut resp).await.unwrap();

        let out = captured.text();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains("No route matches"), "{out}");
        assert!(!out.contains("ERROR"), "{out}");
    }

    #[test]
    fn quiet_paths_match_exactly() {
        let filter = LoggingFilter::default();
        assert!(filter.is_quiet("/api/health"));
        assert!(filter.is_quiet("/"));
        assert!(!filter.is_quiet("/api/health/deep"));
    }
}
