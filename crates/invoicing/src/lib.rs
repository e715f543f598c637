//! Invoicing domain module.
//!
//! Business rules for invoices: line-item and invoice arithmetic, numbering,
//! payments, reminders and the invoice lifecycle. Implemented purely as
//! deterministic domain logic (no IO, no clock, no storage).

pub mod filter;
pub mod invoice;
pub mod line_item;
pub mod number;
pub mod payment;
pub mod recipient;
pub mod status;
pub mod tax;
pub mod totals;

pub use filter::InvoiceFilter;
pub use invoice::{
    CancelInvoice, CreateInvoice, DeleteInvoice, Invoice, InvoiceCancelled, InvoiceCommand,
    InvoiceCreated, InvoiceDeleted, InvoiceEvent, InvoiceId, InvoiceMarkedOverdue, InvoicePatch,
    InvoiceRefunded, InvoiceSent, InvoiceUpdated, MarkOverdue, PaymentRecorded,
    PaymentReminderSent, RecordPayment, RefundInvoice, SendInvoice, SendPaymentReminder,
    UpdateInvoice, AGGREGATE_TYPE,
};
pub use line_item::{
    checked_line_item, compute_line_item, InvoiceLineItem, LineItemAmounts, LineItemInput,
};
pub use number::InvoiceNumber;
pub use payment::{OverpaymentPolicy, PaymentDetails, PaymentInput, PaymentMethod, PaymentRecord};
pub use recipient::{Recipient, RecipientPatch};
pub use status::InvoiceStatus;
pub use tax::TaxRate;
pub use totals::{checked_invoice_totals, compute_invoice_totals, InvoiceTotals};
