//! Backend descriptors and the registry contract.
//!
//! Each backend microservice is described once at startup by a
//! [`BackendDescriptor`]; the [`BackendRegistry`] trait is how the runtime
//! looks descriptors up by id while dispatching.

use super::error::GatewayError;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// BackendDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Description of a backend the gateway forwards requests to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendDescriptor {
    /// Unique stable identifier (must not be empty).
    pub id: String,
    /// Base URL for forwarding (e.g. `http://user-service:3001`).
    pub base_url: String,
    /// Optional path prefix the backend expects in front of every
    /// rewritten path (e.g. `/api`).
    #[serde(default)]
    pub path_prefix: Option<String>,
}

impl BackendDescriptor {
    /// Create a descriptor without a path prefix.
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            path_prefix: None,
        }
    }

    /// Builder: set the path prefix expected by the backend.
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Absolute URL for `downstream_path` (and optional raw query) on this
    /// backend.
    pub fn url_for(&self, downstream_path: &str, query: Option<&str>) -> String {
        let mut url = String::with_capacity(self.base_url.len() + downstream_path.len() + 16);
        url.push_str(self.base_url.trim_end_matches('/'));
        if let Some(prefix) = &self.path_prefix {
            url.push_str(prefix.trim_end_matches('/'));
        }
        url.push_str(downstream_path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Basic sanity checks run during [`GatewayConfig::validate()`](super::validation::GatewayConfig::validate).
    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyBackendId);
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(GatewayError::InvalidEndpoint(
                self.id.clone(),
                format!("base URL '{}' must use http:// or https://", self.base_url),
            ));
        }
        match &self.path_prefix {
            Some(prefix) if !prefix.starts_with('/') => Err(GatewayError::InvalidEndpoint(
                self.id.clone(),
                format!("path prefix '{prefix}' must start with '/'"),
            )),
            _ => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BackendRegistry trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for looking up backend descriptors by id.
///
/// Descriptors are registered once at startup and are read-only afterwards.
pub trait BackendRegistry: Send + Sync {
    /// Register a backend.  Returns [`GatewayError::DuplicateBackend`] if the
    /// id is already taken.
    fn register(&mut self, descriptor: BackendDescriptor) -> Result<(), GatewayError>;

    /// Look up a backend by id.
    fn lookup(&self, id: &str) -> Option<&BackendDescriptor>;

    /// All registered backends.
    fn list_all(&self) -> Vec<&BackendDescriptor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_prefix_path_and_query() {
        let backend = BackendDescriptor::new("support", "http://support-service:3007/")
            .with_path_prefix("/api");
        assert_eq!(
            backend.url_for("/support/tickets", Some("page=2&page=3")),
            "http://support-service:3007/api/support/tickets?page=2&page=3"
        );
        assert_eq!(
            backend.url_for("/support/tickets", Some("")),
            "http://support-service:3007/api/support/tickets"
        );
    }

    #[test]
    fn invalid_descriptors_are_rejected() {
        assert_eq!(
            BackendDescriptor::new(" ", "http://x").validate(),
            Err(GatewayError::EmptyBackendId)
        );
        assert!(matches!(
            BackendDescriptor::new("users", "user-service:3001").validate(),
            Err(GatewayError::InvalidEndpoint(..))
        ));
        assert!(matches!(
            BackendDescriptor::new("users", "http://x")
                .with_path_prefix("api")
                .validate(),
            Err(GatewayError::InvalidEndpoint(..))
        ));
    }
}
