//! Filter module.
//!
//! [`FilterPipeline`] composes the ordered [`GatewayFilter`] stages with a
//! terminal [`Dispatch`] step.  Every request runs the request hooks in
//! ascending order until one rejects; the terminal step runs only when all
//! of them continue; the response hooks of every filter that was entered then
//! run in reverse, whatever produced the response.

mod auth;
mod cors;
mod logger;
mod rate_limit;

pub use auth::{AuthGateFilter, PublicPaths};
pub use cors::CorsFilter;
pub use logger::{LoggingFilter, REQUEST_ID_HEADER};
pub use rate_limit::RateLimitFilter;

use crate::error::{ProxyError, ProxyResult};
use async_trait::async_trait;
use rentway_kernel::{FilterAction, GatewayContext, GatewayFilter, GatewayResponse};
use std::sync::Arc;
use tracing::{error, warn};

/// Terminal step of the pipeline: turns an admitted request into a response.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, ctx: &mut GatewayContext) -> ProxyResult<GatewayResponse>;
}

/// Ordered list of boxed filters executed as a pipeline.
///
/// Filters are sorted by [`FilterOrder`](rentway_kernel::FilterOrder) in
/// ascending order (lowest value runs first on request path).
pub struct FilterPipeline {
    filters: Vec<Arc<dyn GatewayFilter>>,
}

impl FilterPipeline {
    /// Build a pipeline from a list of filters, sorted by their declared order.
    pub fn new(mut filters: Vec<Arc<dyn GatewayFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    /// Filter names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run `ctx` through every stage and the terminal step.
    ///
    /// Always yields a response: filter and dispatch failures are translated
    /// into error responses and recorded under
    /// [`GatewayContext::ERROR_ATTR`] so the logging stage can report them.
    pub async fn execute(&self, ctx: &mut GatewayContext, terminal: &dyn Dispatch) -> GatewayResponse {
        let mut entered = 0;
        let mut early = None;

        for filter in &self.filters {
            entered += 1;
            match filter.on_request(ctx).await {
                Ok(FilterAction::Reject(resp)) => {
                    early = Some(resp);
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    error!(
                        request_id = %ctx.request.id,
                        filter = filter.name(),
                        error = %err,
                        "request filter failed"
                    );
                    let failure = ProxyError::Internal(err.to_string());
                    ctx.set_attr(GatewayContext::ERROR_ATTR, &err.to_string());
                    early = Some(failure.into_gateway_response());
                    break;
                }
            }
        }

        let mut resp = match early {
            Some(resp) => resp,
            None => match terminal.dispatch(ctx).await {
                Ok(resp) => resp,
                Err(err) => {
                    ctx.set_attr(GatewayContext::ERROR_ATTR, &err.to_string());
                    err.into_gateway_response()
                }
            },
        };

        for filter in self.filters[..entered].iter().rev() {
            if let Err(err) = filter.on_response(ctx, &mut resp).await {
                warn!(
                    request_id = %ctx.request.id,
                    filter = filter.name(),
                    error = %err,
                    "response filter failed (response still returned)"
                );
            }
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentway_kernel::{FilterOrder, GatewayError, GatewayRequest, HttpMethod};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records its hooks into a shared journal and optionally rejects.
    struct Recorder {
        name: &'static str,
        order: u32,
        reject: bool,
        fail: bool,
        journal: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl GatewayFilter for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn order(&self) -> FilterOrder {
            FilterOrder(self.order)
        }

        async fn on_request(&self, _ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
            self.journal.lock().unwrap().push(format!("req:{}", self.name));
            if self.fail {
                return Err(GatewayError::Filter(self.name.to_string(), "boom".to_string()));
            }
            if self.reject {
                return Ok(FilterAction::Reject(GatewayResponse::new(418, GatewayResponse::LOCAL)));
            }
            Ok(FilterAction::Continue)
        }

        async fn on_response(&self, _ctx: &GatewayContext, _resp: &mut GatewayResponse) -> Result<(), GatewayError> {
            self.journal.lock().unwrap().push(format!("resp:{}", self.name));
            Ok(())
        }
    }

    struct Terminal {
        calls: AtomicUsize,
        outcome: fn() -> ProxyResult<GatewayResponse>,
    }

    #[async_trait]
    impl Dispatch for Terminal {
        async fn dispatch(&self, _ctx: &mut GatewayContext) -> ProxyResult<GatewayResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn recorder(name: &'static str, order: u32, journal: &Arc<Mutex<Vec<String>>>) -> Recorder {
        Recorder {
            name,
            order,
            reject: false,
            fail: false,
            journal: Arc::clone(journal),
        }
    }

    fn ok_terminal() -> Terminal {
        Terminal {
            calls: AtomicUsize::new(0),
            outcome: || Ok(GatewayResponse::new(200, "users")),
        }
    }

    fn ctx() -> GatewayContext {
        GatewayContext::new(GatewayRequest::new("r1", HttpMethod::Get, "/users/1"))
    }

    #[tokio::test]
    async fn filters_run_in_order_and_unwind_in_reverse() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let pipeline = FilterPipeline::new(vec![
            Arc::new(recorder("rate", 200, &journal)),
            Arc::new(recorder("log", 0, &journal)),
            Arc::new(recorder("auth", 100, &journal)),
        ]);
        assert_eq!(pipeline.names(), vec!["log", "auth", "rate"]);

        let terminal = ok_terminal();
        let resp = pipeline.execute(&mut ctx(), &terminal).await;
        assert_eq!(resp.status, 200);
        assert_eq!(terminal.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["req:log", "req:auth", "req:rate", "resp:rate", "resp:auth", "resp:log"]
        );
    }

    #[tokio::test]
    async fn rejection_short_circuits_and_skips_later_filters() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut auth = recorder("auth", 100, &journal);
        auth.reject = true;
        let pipeline = FilterPipeline::new(vec![
            Arc::new(recorder("log", 0, &journal)),
            Arc::new(auth),
            Arc::new(recorder("rate", 200, &journal)),
        ]);

        let terminal = ok_terminal();
        let resp = pipeline.execute(&mut ctx(), &terminal).await;
        assert_eq!(resp.status, 418);
        assert_eq!(terminal.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["req:log", "req:auth", "resp:auth", "resp:log"]
        );
    }

    #[tokio::test]
    async fn dispatch_error_becomes_response_and_is_recorded() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let pipeline = FilterPipeline::new(vec![Arc::new(recorder("log", 0, &journal))]);
        let terminal = Terminal {
            calls: AtomicUsize::new(0),
            outcome: || {
                Err(ProxyError::BackendUnavailable {
                    backend_id: "users".to_string(),
                    reason: "connection failed".to_string(),
                })
            },
        };

        let mut ctx = ctx();
        let resp = pipeline.execute(&mut ctx, &terminal).await;
        assert_eq!(resp.status, 503);
        assert!(ctx.get_attr::<String>(GatewayContext::ERROR_ATTR).is_some());
        assert_eq!(*journal.lock().unwrap(), vec!["req:log", "resp:log"]);
    }

    #[tokio::test]
    async fn filter_error_yields_500() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut broken = recorder("broken", 100, &journal);
        broken.fail = true;
        let pipeline = FilterPipeline::new(vec![Arc::new(broken)]);

        let terminal = ok_terminal();
        let resp = pipeline.execute(&mut ctx(), &terminal).await;
        assert_eq!(resp.status, 500);
        assert_eq!(terminal.calls.load(Ordering::SeqCst), 0);
    }
}
