//! Gateway filter trait and filter ordering.
//!
//! A filter chain is an ordered list of [`GatewayFilter`] instances applied
//! to every request and response.  Filters are sorted by their declared
//! [`FilterOrder`] and executed in ascending order on the request path
//! (lowest value first) and descending order on the response path.
//!
//! ```text
//! Request  ──► Logging ──► Cors ──► Auth ──► RateLimit ──► (router + backend call)
//! Response ◄── Logging ◄── Cors ◄── Auth ◄── RateLimit ◄──
//! ```
//!
//! A filter that short-circuits with [`FilterAction::Reject`] still sees its
//! own `on_response` call, as do all filters that ran before it; filters after
//! it never observe the request.

use super::error::GatewayError;
use super::types::{GatewayContext, GatewayResponse};
use async_trait::async_trait;

// ─────────────────────────────────────────────────────────────────────────────
// Filter ordering
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric ordering slot for a filter in the chain.
///
/// The well-known slots below act as guidelines; any `u32` value is accepted
/// so implementors can slot in custom filters between the standard phases.
/// Filters with equal order values are executed in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterOrder(pub u32);

impl FilterOrder {
    /// Correlation id, timing and access logging — outermost.
    pub const LOGGING: FilterOrder = FilterOrder(0);
    /// CORS preflight handling and response headers.
    pub const CORS: FilterOrder = FilterOrder(50);
    /// Authentication gate.
    pub const AUTH: FilterOrder = FilterOrder(100);
    /// Rate-limiting / throttling slot.
    pub const RATE_LIMIT: FilterOrder = FilterOrder(200);
    /// Request / response transformation slot.
    pub const TRANSFORM: FilterOrder = FilterOrder(300);
}

// ─────────────────────────────────────────────────────────────────────────────
// Filter action
// ─────────────────────────────────────────────────────────────────────────────

/// Instruction returned by [`GatewayFilter::on_request`] controlling what
/// the gateway does with the request after the filter runs.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum FilterAction {
    /// Pass the request to the next filter or, after the last one, to the
    /// router.
    Continue,
    /// Short-circuit the chain and answer with the given response.  No
    /// backend is contacted.
    Reject(GatewayResponse),
}

impl FilterAction {
    /// `true` for [`FilterAction::Continue`].
    pub fn is_continue(&self) -> bool {
        matches!(self, FilterAction::Continue)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayFilter trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for a single stage in the gateway pipeline.
///
/// Implementations must be `Send + Sync` so they can be shared across Tokio
/// tasks without additional synchronization by the caller.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    /// Stable, human-readable identifier for this filter (used in logs).
    fn name(&self) -> &str;

    /// Position in the filter chain.  Lower values execute first on the
    /// request path.
    fn order(&self) -> FilterOrder;

    /// Called with the inbound request *before* it is routed.
    ///
    /// Return [`FilterAction::Continue`] to proceed, or
    /// [`FilterAction::Reject`] to short-circuit the chain.
    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError>;

    /// Called with the final response *before* it is returned to the caller.
    ///
    /// The response may come from the backend, from the gateway's own
    /// endpoints, from a rejecting filter, or from the pipeline's error
    /// translation.
    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError>;
}
