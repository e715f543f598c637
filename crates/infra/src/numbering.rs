//! Invoice number reservation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use tourdesk_invoicing::InvoiceNumber;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("invoice numbers exhausted for year {0}")]
    Exhausted(i32),

    #[error("invalid invoice number: {0}")]
    Invalid(String),

    #[error("sequence unavailable: {0}")]
    Unavailable(String),
}

/// Reserves invoice numbers from a per-year counter.
///
/// A reserved number is never handed out again, even if the invoice that
/// used it is deleted. Gaps are allowed.
pub trait InvoiceNumberSequence: Send + Sync {
    fn next(&self, year: i32) -> Result<InvoiceNumber, SequenceError>;
}

impl<S> InvoiceNumberSequence for Arc<S>
where
    S: InvoiceNumberSequence + ?Sized,
{
    fn next(&self, year: i32) -> Result<InvoiceNumber, SequenceError> {
        (**self).next(year)
    }
}

/// In-memory counter (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryInvoiceNumberSequence {
    last_used: Mutex<HashMap<i32, u32>>,
}

impl InMemoryInvoiceNumberSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after `last_used` for `year`, e.g. when migrating existing
    /// invoices.
    pub fn starting_after(self, year: i32, last_used: u32) -> Self {
        if let Ok(mut map) = self.last_used.lock() {
            map.insert(year, last_used);
        }
        self
    }

    /// Last reserved sequence for `year` (0 when none).
    pub fn last_used(&self, year: i32) -> u32 {
        self.last_used
            .lock()
            .map(|map| map.get(&year).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl InvoiceNumberSequence for InMemoryInvoiceNumberSequence {
    fn next(&self, year: i32) -> Result<InvoiceNumber, SequenceError> {
        let mut map = self
            .last_used
            .lock()
            .map_err(|_| SequenceError::Unavailable("lock poisoned".to_string()))?;

        let last = map.entry(year).or_insert(0);
        let next = last.checked_add(1).ok_or(SequenceError::Exhausted(year))?;
        let number =
            InvoiceNumber::new(year, next).map_err(|e| SequenceError::Invalid(e.to_string()))?;

        *last = next;
        Ok(number)
    }
}
