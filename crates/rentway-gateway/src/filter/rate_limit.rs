//! Per-client rate-limit filter backed by [`SlidingWindowLimiter`].
//!
//! The client key is the peer address recorded by the server.  Exempt paths
//! (health checks) are never counted.

use crate::error::ProxyError;
use crate::limiter::{Admission, SlidingWindowLimiter};
use async_trait::async_trait;
use rentway_kernel::{
    FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, GatewayResponse,
    RateLimitConfig,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// Rate-limit filter.
pub struct RateLimitFilter {
    limiter: Arc<SlidingWindowLimiter>,
    exempt_paths: HashSet<String>,
}

impl RateLimitFilter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            limiter: Arc::new(SlidingWindowLimiter::new(
                config.max_requests,
                Duration::from_secs(config.window_secs),
            )),
            exempt_paths: config.exempt_paths.iter().cloned().collect(),
        }
    }

    /// Shared limiter, e.g. to hand to the background reaper.
    pub fn limiter(&self) -> Arc<SlidingWindowLimiter> {
        Arc::clone(&self.limiter)
    }
}

#[async_trait]
impl GatewayFilter for RateLimitFilter {
    fn name(&self) -> &str {
        "rate-limit"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::RATE_LIMIT
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        if self.exempt_paths.contains(&ctx.request.path) {
            return Ok(FilterAction::Continue);
        }
        match self.limiter.check(&ctx.request.client_ip) {
            Admission::Admitted { remaining } => {
                trace!(client_ip = %ctx.request.client_ip, remaining, "request admitted");
                Ok(FilterAction::Continue)
            }
            Admission::Rejected { warn } => {
                let limit = self.limiter.max_requests();
                let window_secs = self.limiter.window().as_secs();
                if warn {
                    warn!(
                        client_ip   = %ctx.request.client_ip,
                        path        = %ctx.request.path,
                        limit,
                        window_secs,
                        "rate limit exceeded"
                    );
                }
                Ok(FilterAction::Reject(
                    ProxyError::RateLimited { limit, window_secs }.into_gateway_response(),
                ))
            }
        }
    }

    async fn on_response(
        &self,
        _ctx: &GatewayContext,
        _resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::RETRY_AFTER;
    use rentway_kernel::{GatewayRequest, HttpMethod};

    fn ctx(ip: &str, path: &str) -> GatewayContext {
        GatewayContext::new(GatewayRequest::new("r", HttpMethod::Get, path).with_client_ip(ip))
    }

    #[tokio::test(start_paused = true)]
    async fn quota_exhaustion_yields_429_with_retry_after() {
        let filter = RateLimitFilter::new(&RateLimitConfig::new(2, 30));
        for _ in 0..2 {
            assert!(filter.on_request(&mut ctx("10.0.0.1", "/rentals")).await.unwrap().is_continue());
        }
        let FilterAction::Reject(resp) = filter.on_request(&mut ctx("10.0.0.1", "/rentals")).await.unwrap() else {
            panic!("third request must be rejected");
        };
        assert_eq!(resp.status, 429);
        assert_eq!(resp.headers[RETRY_AFTER], "30");
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["limit"], 2);
        assert_eq!(body["window_seconds"], 30);
    }

    #[tokio::test(start_paused = true)]
    async fn exempt_paths_are_not_counted() {
        let filter = RateLimitFilter::new(&RateLimitConfig::new(1, 60));
        for _ in 0..5 {
            assert!(filter.on_request(&mut ctx("10.0.0.2", "/api/health")).await.unwrap().is_continue());
        }
        assert!(filter.on_request(&mut ctx("10.0.0.2", "/vehicles")).await.unwrap().is_continue());
        assert!(!filter.on_request(&mut ctx("10.0.0.2", "/vehicles")).await.unwrap().is_continue());
    }
}
