//! Router implementations.

mod table;

pub use table::TableRouter;
