use std::sync::Arc;

use thiserror::Error;

use tourdesk_core::ExpectedVersion;
use tourdesk_invoicing::{Invoice, InvoiceFilter, InvoiceId};

/// Invoice store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (validation, lifecycle guards).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("duplicate invoice: {0}")]
    Duplicate(String),

    #[error("invoice {0} not found in store")]
    NotFound(InvoiceId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage port for invoice state.
///
/// ## Write Semantics
///
/// - `append()` adds a new invoice; it fails with `Duplicate` if the id or the
///   invoice number is already taken.
/// - `replace()` and `remove()` are compare-and-swap operations: the stored
///   invoice's version must match `expected`, otherwise `Concurrency`.
///
/// ## Read Semantics
///
/// - `list()` returns matching invoices ordered by issue date, then invoice
///   number.
/// - `get()` returns `None` for unknown ids.
pub trait InvoiceStore: Send + Sync {
    fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, StoreError>;

    fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError>;

    fn append(&self, invoice: Invoice) -> Result<(), StoreError>;

    /// Replace the stored invoice with the same id.
    fn replace(&self, invoice: Invoice, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Remove and return the stored invoice.
    fn remove(&self, id: InvoiceId, expected: ExpectedVersion) -> Result<Invoice, StoreError>;
}

impl<S> InvoiceStore for Arc<S>
where
    S: InvoiceStore + ?Sized,
{
    fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, StoreError> {
        (**self).list(filter)
    }

    fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        (**self).get(id)
    }

    fn append(&self, invoice: Invoice) -> Result<(), StoreError> {
        (**self).append(invoice)
    }

    fn replace(&self, invoice: Invoice, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).replace(invoice, expected)
    }

    fn remove(&self, id: InvoiceId, expected: ExpectedVersion) -> Result<Invoice, StoreError> {
        (**self).remove(id, expected)
    }
}
