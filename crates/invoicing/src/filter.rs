use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tourdesk_core::DateRange;

use crate::invoice::Invoice;
use crate::status::InvoiceStatus;

/// Selection criteria for listing invoices. Every criterion is optional and
/// all present criteria must match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceFilter {
    /// Status-set membership; empty means any status.
    #[serde(default)]
    pub statuses: Vec<InvoiceStatus>,
    /// Inclusive range on `issue_date`.
    #[serde(default)]
    pub issued: Option<DateRange>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub booking_id: Option<String>,
    /// Inclusive bounds on `total_amount`.
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// Case-insensitive currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Case-insensitive substring over invoice number, recipient name and email.
    #[serde(default)]
    pub search: Option<String>,
}

impl InvoiceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    pub fn issued_within(mut self, range: DateRange) -> Self {
        self.issued = Some(range);
        self
    }

    pub fn for_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn for_booking(mut self, booking_id: impl Into<String>) -> Self {
        self.booking_id = Some(booking_id.into());
        self
    }

    pub fn amount_between(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn in_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn matching(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&invoice.status()) {
            return false;
        }
        if let Some(range) = &self.issued {
            if !range.contains(invoice.issue_date()) {
                return false;
            }
        }
        if let Some(customer_id) = &self.customer_id {
            if invoice.customer_id() != Some(customer_id.as_str()) {
                return false;
            }
        }
        if let Some(booking_id) = &self.booking_id {
            if invoice.booking_id() != Some(booking_id.as_str()) {
                return false;
            }
        }
        if self.min_amount.is_some_and(|min| invoice.total_amount() < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| invoice.total_amount() > max) {
            return false;
        }
        if let Some(currency) = &self.currency {
            if !invoice.currency().eq_ignore_ascii_case(currency.trim()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !search_matches(invoice, &needle) {
                return false;
            }
        }
        true
    }
}

fn search_matches(invoice: &Invoice, needle: &str) -> bool {
    let number = invoice
        .invoice_number()
        .map(|n| n.to_string())
        .unwrap_or_default();
    let recipient = invoice.recipient();
    [number.as_str(), recipient.name.as_str(), recipient.email.as_str()]
        .iter()
        .any(|haystack| haystack.to_lowercase().contains(needle))
}
