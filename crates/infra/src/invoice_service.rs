//! Invoice command execution (application-level orchestration).
//!
//! ```text
//! Request
//!   ↓
//! 1. Load the invoice from the store
//!   ↓
//! 2. Handle the command (pure decision logic, produces events)
//!   ↓
//! 3. Call outbound collaborators (delivery), if the operation has one
//!   ↓
//! 4. Apply events and write back (compare-and-swap on the loaded version)
//!   ↓
//! 5. Publish events to the bus
//! ```
//!
//! Any failure before step 4 leaves the store untouched. Publication happens
//! only after a successful write; a publish failure is reported to the caller
//! but the write stands (at-least-once, republishing is safe).

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use tourdesk_core::money::round_money;
use tourdesk_core::{
    Aggregate, AggregateRoot, Clock, DomainError, ExpectedVersion, SystemClock,
};
use tourdesk_events::{EventBus, EventEnvelope};
use tourdesk_invoicing::{
    AGGREGATE_TYPE, CancelInvoice, CreateInvoice, DeleteInvoice, Invoice, InvoiceCommand,
    InvoiceEvent, InvoiceFilter, InvoiceId, InvoiceNumber, InvoicePatch, InvoiceStatus,
    LineItemInput, MarkOverdue, PaymentInput, Recipient, RecordPayment, RefundInvoice,
    SendInvoice, SendPaymentReminder, UpdateInvoice,
};
use tourdesk_reporting::{InvoiceSummary, PeriodError, ReportPeriod};

use crate::config::EngineConfig;
use crate::delivery::{Delivery, DeliveryError, DeliveryMessage};
use crate::export::{ExportError, ExportFormat, ExportPayload, Exporter};
use crate::invoice_store::{InvoiceStore, StoreError};
use crate::numbering::{InvoiceNumberSequence, SequenceError};

/// Messages published by the service.
pub type InvoiceEnvelope = EventEnvelope<InvoiceEvent>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed on `{field}`: {reason}")]
    Validation { field: String, reason: String },

    #[error("invoice {0} not found")]
    NotFound(InvoiceId),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("payment of {attempted} exceeds outstanding amount {outstanding}")]
    Overpayment {
        outstanding: Decimal,
        attempted: Decimal,
    },

    /// Optimistic concurrency failure or duplicate; reload and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Period(#[from] PeriodError),

    /// Publication failed after a successful write.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl ServiceError {
    fn from_domain(id: InvoiceId, err: DomainError) -> Self {
        match err {
            DomainError::Validation { field, reason } => ServiceError::Validation { field, reason },
            DomainError::InvalidState(msg) => ServiceError::InvalidState(msg),
            DomainError::Overpayment {
                outstanding,
                attempted,
            } => ServiceError::Overpayment {
                outstanding,
                attempted,
            },
            DomainError::NotFound => ServiceError::NotFound(id),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::InvariantViolation(msg) | DomainError::InvalidId(msg) => {
                ServiceError::InvariantViolation(msg)
            }
        }
    }

    /// The offending field, for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            ServiceError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) | StoreError::Duplicate(msg) => ServiceError::Conflict(msg),
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Store(other),
        }
    }
}

/// Input for [`InvoiceService::create_invoice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub recipient: Recipient,
    pub line_items: Vec<LineItemInput>,
    /// Defaults to the issue date plus the configured payment terms.
    pub due_date: Option<NaiveDate>,
    pub discount_amount: Option<Decimal>,
    /// Defaults to the configured currency.
    pub currency: Option<String>,
    pub customer_id: Option<String>,
    pub booking_id: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl NewInvoice {
    pub fn new(recipient: Recipient, line_items: Vec<LineItemInput>) -> Self {
        Self {
            recipient,
            line_items,
            due_date: None,
            discount_amount: None,
            currency: None,
            customer_id: None,
            booking_id: None,
            reference: None,
            notes: None,
        }
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_discount(mut self, amount: Decimal) -> Self {
        self.discount_amount = Some(amount);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn for_booking(mut self, customer_id: impl Into<String>, booking_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self.booking_id = Some(booking_id.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// How an invoice is delivered by [`InvoiceService::send_invoice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOptions {
    /// Defaults to the recipient's email.
    pub to: Option<String>,
    pub subject: Option<String>,
    /// Replaces the standard opening line of the body.
    pub message: Option<String>,
    pub attach_pdf: bool,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            to: None,
            subject: None,
            message: None,
            attach_pdf: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderInput {
    /// 1 for the first reminder, 2 for the second, and so on.
    pub reminder_level: u32,
    pub custom_message: Option<String>,
}

impl ReminderInput {
    pub fn level(reminder_level: u32) -> Self {
        Self {
            reminder_level,
            custom_message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefundInput {
    /// `None` refunds the full paid amount.
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
}

/// Invoice engine entry point.
///
/// Generic over the store `S` and the bus `B` (in-memory adapters for
/// tests/dev, real backends in production). Numbering, delivery and the clock
/// are shared collaborators.
pub struct InvoiceService<S, B> {
    store: S,
    bus: B,
    numbers: Arc<dyn InvoiceNumberSequence>,
    delivery: Arc<dyn Delivery>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl<S, B> InvoiceService<S, B> {
    pub fn new(
        store: S,
        bus: B,
        numbers: Arc<dyn InvoiceNumberSequence>,
        delivery: Arc<dyn Delivery>,
    ) -> Self {
        Self {
            store,
            bus,
            numbers,
            delivery,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> InvoiceService<S, B>
where
    S: InvoiceStore,
    B: EventBus<InvoiceEnvelope>,
{
    /// Create a DRAFT invoice issued today with the next invoice number.
    pub fn create_invoice(&self, input: NewInvoice) -> Result<Invoice, ServiceError> {
        let now = self.clock.now();
        let issue_date = now.date_naive();
        let due_date = match input.due_date {
            Some(date) => date,
            None => issue_date
                .checked_add_days(Days::new(u64::from(self.config.payment_terms_days)))
                .ok_or_else(|| ServiceError::Validation {
                    field: "due_date".to_string(),
                    reason: "payment terms overflow the calendar".to_string(),
                })?,
        };

        let id = InvoiceId::generate();
        let command = |invoice_number: InvoiceNumber| {
            InvoiceCommand::CreateInvoice(CreateInvoice {
                invoice_id: id,
                invoice_number,
                currency: input
                    .currency
                    .clone()
                    .unwrap_or_else(|| self.config.default_currency.clone()),
                recipient: input.recipient.clone(),
                line_items: input.line_items.clone(),
                discount_amount: input.discount_amount,
                issue_date,
                due_date,
                customer_id: input.customer_id.clone(),
                booking_id: input.booking_id.clone(),
                reference: input.reference.clone(),
                notes: input.notes.clone(),
                occurred_at: now,
            })
        };

        // Validate before reserving so rejected input does not burn a number.
        let mut invoice = Invoice::empty(id);
        let provisional = InvoiceNumber::new(issue_date.year(), 1)
            .map_err(|e| SequenceError::Invalid(e.to_string()))?;
        invoice
            .handle(&command(provisional))
            .map_err(|e| ServiceError::from_domain(id, e))?;

        let invoice_number = self.numbers.next(issue_date.year())?;
        let events = invoice
            .execute(&command(invoice_number))
            .map_err(|e| ServiceError::from_domain(id, e))?;

        self.store.append(invoice.clone())?;
        self.publish(&invoice, events)?;

        info!(
            invoice_id = %id,
            invoice_number = %invoice_number,
            total_amount = %round_money(invoice.total_amount()),
            "invoice created"
        );
        Ok(invoice)
    }

    pub fn update_invoice(&self, id: InvoiceId, patch: InvoicePatch) -> Result<Invoice, ServiceError> {
        let command = InvoiceCommand::UpdateInvoice(UpdateInvoice {
            invoice_id: id,
            patch,
            occurred_at: self.clock.now(),
        });
        let invoice = self.execute(id, &command, |_, _| Ok(()))?;

        debug!(invoice_id = %id, version = invoice.version(), "invoice updated");
        Ok(invoice)
    }

    /// Remove a DRAFT invoice. Its number is not reused.
    pub fn delete_invoice(&self, id: InvoiceId) -> Result<(), ServiceError> {
        let mut invoice = self.load(id)?;
        let expected = ExpectedVersion::Exact(invoice.version());

        let command = InvoiceCommand::DeleteInvoice(DeleteInvoice {
            invoice_id: id,
            occurred_at: self.clock.now(),
        });
        let events = invoice
            .execute(&command)
            .map_err(|e| ServiceError::from_domain(id, e))?;

        self.store.remove(id, expected)?;
        self.publish(&invoice, events)?;

        info!(invoice_id = %id, "draft invoice deleted");
        Ok(())
    }

    /// Deliver the invoice; a DRAFT becomes SENT, other statuses are resent
    /// unchanged.
    ///
    /// Delivery happens before the write. If the write then fails with
    /// [`ServiceError::Conflict`], the message has already gone out while the
    /// invoice is unchanged; reload and call again, which sends it once more.
    pub fn send_invoice(&self, id: InvoiceId, options: DeliveryOptions) -> Result<Invoice, ServiceError> {
        let command = InvoiceCommand::SendInvoice(SendInvoice {
            invoice_id: id,
            occurred_at: self.clock.now(),
        });
        let invoice = self.execute(id, &command, |invoice, _| {
            let receipt = self.delivery.send(&self.invoice_message(invoice, &options))?;
            debug!(invoice_id = %id, message_id = %receipt.message_id, "invoice delivered");
            Ok(())
        })?;

        info!(invoice_id = %id, status = %invoice.status(), "invoice sent");
        Ok(invoice)
    }

    pub fn record_payment(&self, id: InvoiceId, payment: PaymentInput) -> Result<Invoice, ServiceError> {
        let command = InvoiceCommand::RecordPayment(RecordPayment {
            invoice_id: id,
            payment,
            policy: self.config.overpayment_policy,
            occurred_at: self.clock.now(),
        });
        let invoice = self.execute(id, &command, |_, _| Ok(()))?;

        if invoice.overpaid_amount() > Decimal::ZERO {
            warn!(
                invoice_id = %id,
                overpaid_amount = %round_money(invoice.overpaid_amount()),
                "payment exceeds invoice total; excess kept as credit"
            );
        }
        info!(
            invoice_id = %id,
            paid_amount = %round_money(invoice.paid_amount()),
            status = %invoice.status(),
            "payment recorded"
        );
        Ok(invoice)
    }

    /// Deliver a payment reminder and count it. On
    /// [`ServiceError::Conflict`] the reminder has been delivered but not
    /// counted, as with [`InvoiceService::send_invoice`].
    pub fn send_payment_reminder(&self, id: InvoiceId, reminder: ReminderInput) -> Result<Invoice, ServiceError> {
        let command = InvoiceCommand::SendPaymentReminder(SendPaymentReminder {
            invoice_id: id,
            reminder_level: reminder.reminder_level,
            reminder_date: self.clock.today(),
            occurred_at: self.clock.now(),
        });
        let invoice = self.execute(id, &command, |invoice, _| {
            self.delivery.send(&self.reminder_message(invoice, &reminder))?;
            Ok(())
        })?;

        info!(
            invoice_id = %id,
            reminder_level = reminder.reminder_level,
            reminders_sent = invoice.reminders_sent(),
            "payment reminder sent"
        );
        Ok(invoice)
    }

    /// Move every SENT invoice that is unpaid and past due on `today` to
    /// OVERDUE. Returns only the invoices that changed.
    ///
    /// Failures on individual invoices are logged and skipped. Only a failure
    /// to list the candidates is returned.
    pub fn check_overdue_invoices(&self, today: NaiveDate) -> Result<Vec<Invoice>, ServiceError> {
        let candidates = self
            .store
            .list(&InvoiceFilter::all().with_status(InvoiceStatus::Sent))?;

        let mut transitioned = Vec::new();
        for candidate in candidates.iter().filter(|i| i.is_overdue_on(today)) {
            let id = candidate.id_typed();
            let command = InvoiceCommand::MarkOverdue(MarkOverdue {
                invoice_id: id,
                today,
                occurred_at: self.clock.now(),
            });
            match self.execute(id, &command, |_, _| Ok(())) {
                Ok(invoice) if invoice.status() == InvoiceStatus::Overdue => {
                    info!(invoice_id = %id, due_date = %invoice.due_date(), "invoice overdue");
                    transitioned.push(invoice);
                }
                Ok(_) => {}
                // The write stands; only subscribers missed the event.
                Err(ServiceError::Publish(msg)) => {
                    warn!(invoice_id = %id, error = %msg, "invoice marked overdue but not published");
                    match self.load(id) {
                        Ok(invoice) if invoice.status() == InvoiceStatus::Overdue => {
                            transitioned.push(invoice)
                        }
                        Ok(_) => {}
                        Err(err) => warn!(invoice_id = %id, error = %err, "overdue invoice reload failed"),
                    }
                }
                // Conflicts included: the next sweep sees the new state.
                Err(err) => {
                    warn!(invoice_id = %id, error = %err, "overdue sweep skipped invoice");
                }
            }
        }

        debug!(%today, checked = candidates.len(), transitioned = transitioned.len(), "overdue sweep finished");
        Ok(transitioned)
    }

    pub fn cancel_invoice(&self, id: InvoiceId, reason: Option<String>) -> Result<Invoice, ServiceError> {
        let command = InvoiceCommand::CancelInvoice(CancelInvoice {
            invoice_id: id,
            reason,
            occurred_at: self.clock.now(),
        });
        let invoice = self.execute(id, &command, |_, _| Ok(()))?;

        info!(invoice_id = %id, "invoice cancelled");
        Ok(invoice)
    }

    pub fn refund_invoice(&self, id: InvoiceId, refund: RefundInput) -> Result<Invoice, ServiceError> {
        let command = InvoiceCommand::RefundInvoice(RefundInvoice {
            invoice_id: id,
            amount: refund.amount,
            reason: refund.reason,
            occurred_at: self.clock.now(),
        });
        let invoice = self.execute(id, &command, |_, _| Ok(()))?;

        info!(
            invoice_id = %id,
            refunded_amount = %round_money(invoice.refunded_amount()),
            "invoice refunded"
        );
        Ok(invoice)
    }

    pub fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, ServiceError> {
        self.load(id)
    }

    pub fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, ServiceError> {
        Ok(self.store.list(filter)?)
    }

    /// Summary over invoices issued within `period` as seen on `today`.
    pub fn summarize(&self, period: ReportPeriod, today: NaiveDate) -> Result<InvoiceSummary, ServiceError> {
        let range = period.resolve(today)?;
        let invoices = self.store.list(&InvoiceFilter::all().issued_within(range))?;
        Ok(InvoiceSummary::from_invoices(&invoices, range))
    }

    pub fn export_invoices(
        &self,
        filter: &InvoiceFilter,
        format: ExportFormat,
        exporter: &dyn Exporter,
    ) -> Result<Vec<u8>, ServiceError> {
        let invoices = self.store.list(filter)?;
        let count = invoices.len();
        let bytes = exporter.export(&ExportPayload::Invoices(invoices), format)?;

        debug!(%format, invoices = count, bytes = bytes.len(), "invoices exported");
        Ok(bytes)
    }

    pub fn export_summary(
        &self,
        period: ReportPeriod,
        today: NaiveDate,
        format: ExportFormat,
        exporter: &dyn Exporter,
    ) -> Result<Vec<u8>, ServiceError> {
        let summary = self.summarize(period, today)?;
        Ok(exporter.export(&ExportPayload::Summary(summary.rounded()), format)?)
    }

    fn load(&self, id: InvoiceId) -> Result<Invoice, ServiceError> {
        self.store.get(id)?.ok_or(ServiceError::NotFound(id))
    }

    /// Load → handle → `before_write` → apply → replace → publish.
    ///
    /// `before_write` runs only when the command produced events and sees the
    /// invoice as it was loaded.
    fn execute<F>(&self, id: InvoiceId, command: &InvoiceCommand, before_write: F) -> Result<Invoice, ServiceError>
    where
        F: FnOnce(&Invoice, &[InvoiceEvent]) -> Result<(), ServiceError>,
    {
        let mut invoice = self.load(id)?;
        let expected = ExpectedVersion::Exact(invoice.version());

        let events = invoice
            .handle(command)
            .map_err(|e| ServiceError::from_domain(id, e))?;
        if events.is_empty() {
            return Ok(invoice);
        }

        before_write(&invoice, &events)?;

        for event in &events {
            invoice.apply(event);
        }
        self.store.replace(invoice.clone(), expected)?;
        self.publish(&invoice, events)?;

        Ok(invoice)
    }

    /// Publish events already applied to `invoice`, numbered by the versions
    /// they produced.
    fn publish(&self, invoice: &Invoice, events: Vec<InvoiceEvent>) -> Result<(), ServiceError> {
        let first = invoice.version() + 1 - events.len() as u64;
        for (offset, event) in events.into_iter().enumerate() {
            let envelope = EventEnvelope::new(
                invoice.id_typed().0,
                AGGREGATE_TYPE,
                first + offset as u64,
                event,
            );
            self.bus
                .publish(envelope)
                .map_err(|e| ServiceError::Publish(format!("{e:?}")))?;
        }
        Ok(())
    }

    fn invoice_message(&self, invoice: &Invoice, options: &DeliveryOptions) -> DeliveryMessage {
        let number = display_number(invoice);
        let opening = options
            .message
            .clone()
            .unwrap_or_else(|| format!("Please find invoice {number} attached."));

        DeliveryMessage {
            to: options
                .to
                .clone()
                .unwrap_or_else(|| invoice.recipient().email.clone()),
            subject: options
                .subject
                .clone()
                .unwrap_or_else(|| format!("Invoice {number} from {}", self.config.sender_name)),
            body: format!(
                "Hello {},\n\n{opening}\n\nAmount due: {:.2} {}\nDue date: {}\n\n{}\n",
                invoice.recipient().name,
                round_money(invoice.outstanding_amount()),
                invoice.currency(),
                invoice.due_date(),
                self.config.sender_name,
            ),
            attach_pdf: options.attach_pdf,
        }
    }

    fn reminder_message(&self, invoice: &Invoice, reminder: &ReminderInput) -> DeliveryMessage {
        let number = display_number(invoice);
        let subject = match reminder.reminder_level {
            1 => format!("Payment reminder: invoice {number}"),
            level => format!("Payment reminder {level}: invoice {number}"),
        };
        let opening = reminder.custom_message.clone().unwrap_or_else(|| {
            format!(
                "Our records show that invoice {number}, due {}, is still unpaid.",
                invoice.due_date()
            )
        });

        DeliveryMessage {
            to: invoice.recipient().email.clone(),
            subject,
            body: format!(
                "Hello {},\n\n{opening}\n\nOutstanding amount: {:.2} {}\n\n{}\n",
                invoice.recipient().name,
                round_money(invoice.outstanding_amount()),
                invoice.currency(),
                self.config.sender_name,
            ),
            attach_pdf: true,
        }
    }
}

fn display_number(invoice: &Invoice) -> String {
    invoice
        .invoice_number()
        .map(|n| n.to_string())
        .unwrap_or_else(|| invoice.id_typed().to_string())
}
