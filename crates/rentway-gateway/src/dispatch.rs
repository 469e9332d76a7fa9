//! Terminal pipeline step: local endpoints, then routing and forwarding.

use crate::backend::{HttpForwarder, InMemoryBackendRegistry};
use crate::error::{ProxyError, ProxyResult};
use crate::filter::Dispatch;
use crate::handlers::LocalEndpoints;
use crate::router::TableRouter;
use async_trait::async_trait;
use rentway_kernel::{BackendRegistry, GatewayContext, GatewayResponse, GatewayRouter};
use tracing::debug;

/// Resolves an admitted request to a response.
pub struct Dispatcher {
    local: LocalEndpoints,
    router: TableRouter,
    registry: InMemoryBackendRegistry,
    forwarder: HttpForwarder,
}

impl Dispatcher {
    pub fn new(
        local: LocalEndpoints,
        router: TableRouter,
        registry: InMemoryBackendRegistry,
        forwarder: HttpForwarder,
    ) -> Self {
        Self {
            local,
            router,
            registry,
            forwarder,
        }
    }
}

#[async_trait]
impl Dispatch for Dispatcher {
    async fn dispatch(&self, ctx: &mut GatewayContext) -> ProxyResult<GatewayResponse> {
        if let Some(local) = self.local.serve(&ctx.request).await {
            return local;
        }

        let route = self
            .router
            .resolve(&ctx.request.path, &ctx.request.method)
            .ok_or_else(|| ProxyError::NoRoute {
                method: ctx.request.method.to_string(),
                path: ctx.request.path.clone(),
            })?;
        let backend = self.registry.lookup(&route.backend_id).ok_or_else(|| {
            ProxyError::Internal(format!("backend '{}' is not registered", route.backend_id))
        })?;
        debug!(
            request_id = %ctx.request.id,
            route      = %route.route_id,
            backend    = %backend.id,
            downstream = %route.downstream_path,
            "route resolved"
        );

        let result = self.forwarder.forward(backend, &route, &ctx.request).await;
        ctx.route_match = Some(route);
        result
    }
}
