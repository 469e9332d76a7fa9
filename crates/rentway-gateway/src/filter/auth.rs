//! Authentication gate.
//!
//! Classifies each path as public or protected.  Protected requests must
//! carry a credential header; the gateway only checks that it is present and
//! leaves verification to the backend service.  CORS preflights always pass.

use crate::error::ProxyError;
use async_trait::async_trait;
use regex::Regex;
use rentway_kernel::{
    AuthConfig, FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter,
    GatewayResponse, HttpMethod,
};
use tracing::warn;

/// Public-path table: literal paths (with their sub-paths) plus compiled
/// patterns.
#[derive(Debug, Clone)]
pub struct PublicPaths {
    literals: Vec<String>,
    patterns: Vec<Regex>,
}

impl PublicPaths {
    pub fn from_config(config: &AuthConfig) -> Result<Self, GatewayError> {
        let literals = config
            .public_paths
            .iter()
            .map(|p| {
                if p.len() > 1 {
                    p.trim_end_matches('/').to_string()
                } else {
                    p.clone()
                }
            })
            .collect();
        let patterns = config
            .public_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| GatewayError::InvalidPublicPath(p.clone(), e.to_string())))
            .collect::<Result<_, _>>()?;
        Ok(Self { literals, patterns })
    }

    /// `/` only covers itself; every other entry also covers its sub-paths.
    pub fn is_public(&self, path: &str) -> bool {
        self.literals.iter().any(|public| {
            path == public
                || (public != "/"
                    && path
                        .strip_prefix(public.as_str())
                        .is_some_and(|rest| rest.starts_with('/')))
        }) || self.patterns.iter().any(|re| re.is_match(path))
    }
}

/// Authentication gate filter.
pub struct AuthGateFilter {
    public: PublicPaths,
    credential_header: String,
}

impl AuthGateFilter {
    pub fn new(config: &AuthConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            public: PublicPaths::from_config(config)?,
            credential_header: config.credential_header.to_ascii_lowercase(),
        })
    }

    fn has_credential(&self, ctx: &GatewayContext) -> bool {
        ctx.request
            .header(&self.credential_header)
            .is_some_and(|value| !value.trim().is_empty())
    }
}

#[async_trait]
impl GatewayFilter for AuthGateFilter {
    fn name(&self) -> &str {
        "auth-gate"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::AUTH
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        if ctx.request.method == HttpMethod::Options
            || self.public.is_public(&ctx.request.path)
            || self.has_credential(ctx)
        {
            return Ok(FilterAction::Continue);
        }
        warn!(
            request_id = %ctx.request.id,
            path       = %ctx.request.path,
            client_ip  = %ctx.request.client_ip,
            "rejected request: authentication required"
        );
        Ok(FilterAction::Reject(ProxyError::Unauthenticated.into_gateway_response()))
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
    use rentway_kernel::GatewayRequest;

    fn gate() -> AuthGateFilter {
        AuthGateFilter::new(&AuthConfig::default()).unwrap()
    }

    fn ctx(method: HttpMethod, path: &str, auth: Option<&str>) -> GatewayContext {
        let mut req = GatewayRequest::new("req-1", method, path);
        if let Some(v) = auth {
            req = req.with_header("Authorization", v);
        }
        GatewayContext::new(req)
    }

    async fn admitted(method: HttpMethod, path: &str, auth: Option<&str>) -> bool {
        gate()
            .on_request(&mut ctx(method, path, auth))
            .await
            .unwrap()
            .is_continue()
    }

    #[tokio::test]
    async fn public_paths_need_no_credential() {
        for path in [
            "/",
            "/api/health",
            "/auth/login",
            "/vehicles",
            "/vehicles/12",
            "/vehicles/search/suv",
            "/rentals/availability",
            "/uploads/cars/1.jpg",
        ] {
            assert!(admitted(HttpMethod::Get, path, None).await, "{path} should be public");
        }
    }

    #[tokio::test]
    async fn protected_path_without_credential_is_rejected() {
        let action = gate()
            .on_request(&mut ctx(HttpMethod::Get, "/rentals/5", None))
            .await
            .unwrap();
        let FilterAction::Reject(resp) = action else {
            panic!("expected rejection");
        };
        assert_eq!(resp.status, 401);
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["detail"], "Authentication required");
    }

    #[tokio::test]
    async fn credential_presence_is_enough() {
        assert!(admitted(HttpMethod::Get, "/payments/1", Some("Bearer anything")).await);
        assert!(!admitted(HttpMethod::Get, "/payments/1", Some("  ")).await);
    }

    #[tokio::test]
    async fn preflight_always_passes() {
        assert!(admitted(HttpMethod::Options, "/admin/users", None).await);
    }

    #[test]
    fn root_entry_does_not_cover_everything() {
        let public = PublicPaths::from_config(&AuthConfig::default()).unwrap();
        assert!(public.is_public("/"));
        assert!(!public.is_public("/users/1"));
        assert!(!public.is_public("/vehiclesX"));
        assert!(!public.is_public("/information"));
    }

    #[test]
    fn extra_public_paths_and_patterns_apply() {
        let mut config = AuthConfig::default().with_public_paths(["/support/faq/".to_string()]);
        config.public_patterns.push(r"^/ratings/\d+$".to_string());
        let public = PublicPaths::from_config(&config).unwrap();
        assert!(public.is_public("/support/faq"));
        assert!(public.is_public("/support/faq/billing"));
        assert!(public.is_public("/ratings/9"));
        assert!(!public.is_public("/ratings/9/edit"));
    }
}
