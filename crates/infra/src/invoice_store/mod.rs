//! Invoice storage boundary.
//!
//! An injected port with an in-memory adapter for tests/dev; a database-backed
//! adapter implements the same trait.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryInvoiceStore;
pub use r#trait::{InvoiceStore, StoreError};
