//! In-memory [`BackendRegistry`] implementation.

use rentway_kernel::{BackendDescriptor, BackendRegistry, GatewayError};
use std::collections::HashMap;

/// [`BackendRegistry`] backed by a simple `HashMap`.
///
/// Filled once at startup from the validated config; read-only afterwards.
#[derive(Debug, Default)]
pub struct InMemoryBackendRegistry {
    store: HashMap<String, BackendDescriptor>,
}

impl InMemoryBackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendRegistry for InMemoryBackendRegistry {
    fn register(&mut self, descriptor: BackendDescriptor) -> Result<(), GatewayError> {
        if self.store.contains_key(&descriptor.id) {
            return Err(GatewayError::DuplicateBackend(descriptor.id));
        }
        self.store.insert(descriptor.id.clone(), descriptor);
        Ok(())
    }

    fn lookup(&self, id: &str) -> Option<&BackendDescriptor> {
        self.store.get(id)
    }

    fn list_all(&self) -> Vec<&BackendDescriptor> {
        let mut all: Vec<_> = self.store.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}
