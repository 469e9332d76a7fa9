//! Backend module.

mod forwarder;
mod registry;

pub use forwarder::HttpForwarder;
pub use registry::InMemoryBackendRegistry;
