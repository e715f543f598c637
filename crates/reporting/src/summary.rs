use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use tourdesk_core::DateRange;
use tourdesk_core::money::round_money;
use tourdesk_invoicing::{Invoice, InvoiceStatus, TaxRate};

/// Number of invoices per status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub sent: usize,
    pub paid: usize,
    pub overdue: usize,
    pub cancelled: usize,
    pub refunded: usize,
}

impl StatusCounts {
    pub fn get(&self, status: InvoiceStatus) -> usize {
        match status {
            InvoiceStatus::Draft => self.draft,
            InvoiceStatus::Sent => self.sent,
            InvoiceStatus::Paid => self.paid,
            InvoiceStatus::Overdue => self.overdue,
            InvoiceStatus::Cancelled => self.cancelled,
            InvoiceStatus::Refunded => self.refunded,
        }
    }

    fn bump(&mut self, status: InvoiceStatus) {
        let slot = match status {
            InvoiceStatus::Draft => &mut self.draft,
            InvoiceStatus::Sent => &mut self.sent,
            InvoiceStatus::Paid => &mut self.paid,
            InvoiceStatus::Overdue => &mut self.overdue,
            InvoiceStatus::Cancelled => &mut self.cancelled,
            InvoiceStatus::Refunded => &mut self.refunded,
        };
        *slot += 1;
    }
}

/// Net, tax and gross line amounts for one VAT rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxBreakdown {
    pub rate: TaxRate,
    pub net_amount: Decimal,
    pub tax_amount: Decimal,
    pub gross_amount: Decimal,
    pub line_count: usize,
}

impl TaxBreakdown {
    fn empty(rate: TaxRate) -> Self {
        Self {
            rate,
            net_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            gross_amount: Decimal::ZERO,
            line_count: 0,
        }
    }
}

/// Invoice figures for the invoices issued within a date range.
///
/// Every invoice counts towards `invoice_count` and `by_status`; cancelled
/// invoices are left out of every monetary figure. Amounts are exact (not
/// rounded); use [`InvoiceSummary::rounded`] for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceSummary {
    pub range: DateRange,
    pub invoice_count: usize,
    pub by_status: StatusCounts,
    pub subtotal: Decimal,
    pub total_tax: Decimal,
    pub total_discount: Decimal,
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    pub total_refunded: Decimal,
    /// Unpaid amount on SENT and OVERDUE invoices.
    pub total_outstanding: Decimal,
    /// Unpaid amount on OVERDUE invoices.
    pub overdue_amount: Decimal,
    /// Ordered by rate.
    pub tax_breakdown: Vec<TaxBreakdown>,
}

impl InvoiceSummary {
    pub fn from_invoices<'a, I>(invoices: I, range: DateRange) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let mut summary = Self {
            range,
            invoice_count: 0,
            by_status: StatusCounts::default(),
            subtotal: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            total_discount: Decimal::ZERO,
            total_invoiced: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            total_refunded: Decimal::ZERO,
            total_outstanding: Decimal::ZERO,
            overdue_amount: Decimal::ZERO,
            tax_breakdown: Vec::new(),
        };
        let mut by_rate: BTreeMap<TaxRate, TaxBreakdown> = BTreeMap::new();

        for invoice in invoices {
            if !range.contains(invoice.issue_date()) {
                continue;
            }
            summary.invoice_count += 1;
            summary.by_status.bump(invoice.status());

            if invoice.status() == InvoiceStatus::Cancelled {
                continue;
            }

            summary.subtotal += invoice.subtotal();
            summary.total_tax += invoice.total_tax();
            summary.total_discount += invoice.discount_amount();
            summary.total_invoiced += invoice.total_amount();
            summary.total_paid += invoice.paid_amount();
            summary.total_refunded += invoice.refunded_amount();

            if invoice.status().is_receivable() {
                summary.total_outstanding += invoice.outstanding_amount();
            }
            if invoice.status() == InvoiceStatus::Overdue {
                summary.overdue_amount += invoice.outstanding_amount();
            }

            for line in invoice.line_items() {
                let entry = by_rate
                    .entry(line.tax_rate())
                    .or_insert_with(|| TaxBreakdown::empty(line.tax_rate()));
                entry.net_amount += line.amount();
                entry.tax_amount += line.tax_amount();
                entry.gross_amount += line.total();
                entry.line_count += 1;
            }
        }

        summary.tax_breakdown = by_rate.into_values().collect();
        summary
    }

    /// Share of the invoiced amount that has been paid, in percent.
    /// `None` when nothing was invoiced.
    pub fn collection_rate(&self) -> Option<Decimal> {
        if self.total_invoiced.is_zero() {
            return None;
        }
        Some(round_money(
            self.total_paid / self.total_invoiced * Decimal::ONE_HUNDRED,
        ))
    }

    /// Copy with every amount rounded to two decimals.
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: round_money(self.subtotal),
            total_tax: round_money(self.total_tax),
            total_discount: round_money(self.total_discount),
            total_invoiced: round_money(self.total_invoiced),
            total_paid: round_money(self.total_paid),
            total_refunded: round_money(self.total_refunded),
            total_outstanding: round_money(self.total_outstanding),
            overdue_amount: round_money(self.overdue_amount),
            tax_breakdown: self
                .tax_breakdown
                .iter()
                .map(|b| TaxBreakdown {
                    rate: b.rate,
                    net_amount: round_money(b.net_amount),
                    tax_amount: round_money(b.tax_amount),
                    gross_amount: round_money(b.gross_amount),
                    line_count: b.line_count,
                })
                .collect(),
            ..self.clone()
        }
    }
}
