use std::collections::HashMap;
use std::sync::RwLock;

use tourdesk_core::{AggregateRoot, ExpectedVersion};
use tourdesk_invoicing::{Invoice, InvoiceFilter, InvoiceId};

use super::r#trait::{InvoiceStore, StoreError};

/// In-memory invoice store.
///
/// Intended for tests/dev. Not optimized for performance (`list` scans).
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `invoices` (later duplicates win).
    pub fn seeded(invoices: impl IntoIterator<Item = Invoice>) -> Self {
        let invoices = invoices
            .into_iter()
            .map(|invoice| (invoice.id_typed(), invoice))
            .collect();
        Self {
            invoices: RwLock::new(invoices),
        }
    }

    pub fn len(&self) -> usize {
        self.invoices.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

fn check_version(stored: &Invoice, expected: ExpectedVersion) -> Result<(), StoreError> {
    let current = stored.version();
    if !expected.matches(current) {
        return Err(StoreError::Concurrency(format!(
            "invoice {}: expected {expected:?}, found {current}",
            stored.id_typed()
        )));
    }
    Ok(())
}

impl InvoiceStore for InMemoryInvoiceStore {
    fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, StoreError> {
        let invoices = self.invoices.read().map_err(|_| poisoned())?;

        let mut matching: Vec<Invoice> = invoices
            .values()
            .filter(|invoice| filter.matches(invoice))
            .cloned()
            .collect();
        matching.sort_by_key(|invoice| (invoice.issue_date(), invoice.invoice_number()));

        Ok(matching)
    }

    fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let invoices = self.invoices.read().map_err(|_| poisoned())?;
        Ok(invoices.get(&id).cloned())
    }

    fn append(&self, invoice: Invoice) -> Result<(), StoreError> {
        let mut invoices = self.invoices.write().map_err(|_| poisoned())?;

        let id = invoice.id_typed();
        if invoices.contains_key(&id) {
            return Err(StoreError::Duplicate(format!("invoice id {id} already stored")));
        }
        if let Some(number) = invoice.invoice_number() {
            if invoices.values().any(|other| other.invoice_number() == Some(number)) {
                return Err(StoreError::Duplicate(format!(
                    "invoice number {number} already stored"
                )));
            }
        }

        invoices.insert(id, invoice);
        Ok(())
    }

    fn replace(&self, invoice: Invoice, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut invoices = self.invoices.write().map_err(|_| poisoned())?;

        let id = invoice.id_typed();
        let stored = invoices.get(&id).ok_or(StoreError::NotFound(id))?;
        check_version(stored, expected)?;

        invoices.insert(id, invoice);
        Ok(())
    }

    fn remove(&self, id: InvoiceId, expected: ExpectedVersion) -> Result<Invoice, StoreError> {
        let mut invoices = self.invoices.write().map_err(|_| poisoned())?;

        let stored = invoices.get(&id).ok_or(StoreError::NotFound(id))?;
        check_version(stored, expected)?;

        invoices.remove(&id).ok_or(StoreError::NotFound(id))
    }
}
