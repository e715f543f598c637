use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tourdesk_core::money::non_negative;
use tourdesk_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult};
use tourdesk_events::Event;

use crate::line_item::{InvoiceLineItem, LineItemInput};
use crate::number::InvoiceNumber;
use crate::payment::{OverpaymentPolicy, PaymentDetails, PaymentInput, PaymentRecord};
use crate::recipient::{Recipient, RecipientPatch};
use crate::status::InvoiceStatus;
use crate::totals::{checked_invoice_totals, InvoiceTotals};

/// Stream/aggregate type name used in event envelopes.
pub const AGGREGATE_TYPE: &str = "invoicing.invoice";

/// Invoice identifier (opaque, immutable after creation).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// Fresh, time-ordered identifier.
    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for InvoiceId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    id: InvoiceId,
    invoice_number: Option<InvoiceNumber>,
    status: InvoiceStatus,
    currency: String,
    recipient: Recipient,
    line_items: Vec<InvoiceLineItem>,
    totals: InvoiceTotals,
    paid_amount: Decimal,
    refunded_amount: Decimal,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    paid_date: Option<NaiveDate>,
    customer_id: Option<String>,
    booking_id: Option<String>,
    reference: Option<String>,
    notes: Option<String>,
    payment_details: Option<PaymentDetails>,
    payments: Vec<PaymentRecord>,
    reminders_sent: u32,
    last_reminder_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    refunded_at: Option<DateTime<Utc>>,
    refund_reason: Option<String>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            invoice_number: None,
            status: InvoiceStatus::Draft,
            currency: String::new(),
            recipient: Recipient::default(),
            line_items: Vec::new(),
            totals: InvoiceTotals::default(),
            paid_amount: Decimal::ZERO,
            refunded_amount: Decimal::ZERO,
            issue_date: NaiveDate::MIN,
            due_date: NaiveDate::MIN,
            paid_date: None,
            customer_id: None,
            booking_id: None,
            reference: None,
            notes: None,
            payment_details: None,
            payments: Vec::new(),
            reminders_sent: 0,
            last_reminder_date: None,
            created_at: DateTime::<Utc>::MIN_UTC,
            updated_at: DateTime::<Utc>::MIN_UTC,
            sent_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            refunded_at: None,
            refund_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    /// `None` only before the invoice has been created.
    pub fn invoice_number(&self) -> Option<InvoiceNumber> {
        self.invoice_number
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn recipient(&self) -> &Recipient {
        &self.recipient
    }

    pub fn line_items(&self) -> &[InvoiceLineItem] {
        &self.line_items
    }

    pub fn totals(&self) -> InvoiceTotals {
        self.totals
    }

    pub fn subtotal(&self) -> Decimal {
        self.totals.subtotal
    }

    pub fn total_tax(&self) -> Decimal {
        self.totals.total_tax
    }

    pub fn discount_amount(&self) -> Decimal {
        self.totals.discount_amount
    }

    pub fn total_amount(&self) -> Decimal {
        self.totals.total_amount
    }

    pub fn paid_amount(&self) -> Decimal {
        self.paid_amount
    }

    pub fn refunded_amount(&self) -> Decimal {
        self.refunded_amount
    }

    /// `max(total − paid, 0)`.
    pub fn outstanding_amount(&self) -> Decimal {
        non_negative(self.totals.total_amount - self.paid_amount)
    }

    /// `max(paid − total, 0)`; non-zero only for accepted overpayments.
    pub fn overpaid_amount(&self) -> Decimal {
        non_negative(self.paid_amount - self.totals.total_amount)
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn paid_date(&self) -> Option<NaiveDate> {
        self.paid_date
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn booking_id(&self) -> Option<&str> {
        self.booking_id.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Latest payment's method and references.
    pub fn payment_details(&self) -> Option<&PaymentDetails> {
        self.payment_details.as_ref()
    }

    /// Every payment recorded, oldest first.
    pub fn payments(&self) -> &[PaymentRecord] {
        &self.payments
    }

    pub fn reminders_sent(&self) -> u32 {
        self.reminders_sent
    }

    pub fn last_reminder_date(&self) -> Option<NaiveDate> {
        self.last_reminder_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    pub fn refund_reason(&self) -> Option<&str> {
        self.refund_reason.as_deref()
    }

    /// Sent, unpaid and past its due date on `today`.
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Sent
            && self.due_date < today
            && self.paid_amount < self.totals.total_amount
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub invoice_id: InvoiceId,
    pub invoice_number: InvoiceNumber,
    pub currency: String,
    pub recipient: Recipient,
    pub line_items: Vec<LineItemInput>,
    pub discount_amount: Option<Decimal>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub customer_id: Option<String>,
    pub booking_id: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Partial invoice update; `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoicePatch {
    pub recipient: Option<RecipientPatch>,
    /// Replaces all lines when present.
    pub line_items: Option<Vec<LineItemInput>>,
    pub due_date: Option<NaiveDate>,
    pub discount_amount: Option<Decimal>,
    pub customer_id: Option<String>,
    pub booking_id: Option<String>,
    pub reference: Option<String>,
    /// An empty string clears the notes.
    pub notes: Option<String>,
}

/// Command: UpdateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInvoice {
    pub invoice_id: InvoiceId,
    pub patch: InvoicePatch,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInvoice {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendInvoice (first send or resend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendInvoice {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub invoice_id: InvoiceId,
    pub payment: PaymentInput,
    pub policy: OverpaymentPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendPaymentReminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPaymentReminder {
    pub invoice_id: InvoiceId,
    pub reminder_level: u32,
    pub reminder_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkOverdue (issued per invoice by the overdue sweep).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkOverdue {
    pub invoice_id: InvoiceId,
    pub today: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelInvoice {
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RefundInvoice. `amount: None` refunds everything paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundInvoice {
    pub invoice_id: InvoiceId,
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    UpdateInvoice(UpdateInvoice),
    DeleteInvoice(DeleteInvoice),
    SendInvoice(SendInvoice),
    RecordPayment(RecordPayment),
    SendPaymentReminder(SendPaymentReminder),
    MarkOverdue(MarkOverdue),
    CancelInvoice(CancelInvoice),
    RefundInvoice(RefundInvoice),
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub invoice_id: InvoiceId,
    pub invoice_number: InvoiceNumber,
    pub currency: String,
    pub recipient: Recipient,
    pub line_items: Vec<InvoiceLineItem>,
    pub totals: InvoiceTotals,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub customer_id: Option<String>,
    pub booking_id: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceUpdated (carries the full editable content after the update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceUpdated {
    pub invoice_id: InvoiceId,
    pub recipient: Recipient,
    pub line_items: Vec<InvoiceLineItem>,
    pub totals: InvoiceTotals,
    pub due_date: NaiveDate,
    pub customer_id: Option<String>,
    pub booking_id: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDeleted {
    pub invoice_id: InvoiceId,
    pub invoice_number: InvoiceNumber,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSent {
    pub invoice_id: InvoiceId,
    pub previous_status: InvoiceStatus,
    pub status: InvoiceStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub invoice_id: InvoiceId,
    pub payment: PaymentRecord,
    pub new_paid_amount: Decimal,
    /// Excess of the paid amount over the total after this payment.
    pub overpaid_amount: Decimal,
    /// This payment moved the invoice to `PAID`.
    pub fully_paid: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentReminderSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReminderSent {
    pub invoice_id: InvoiceId,
    pub reminder_level: u32,
    pub reminder_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceMarkedOverdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMarkedOverdue {
    pub invoice_id: InvoiceId,
    pub due_date: NaiveDate,
    pub outstanding_amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    pub invoice_id: InvoiceId,
    pub previous_status: InvoiceStatus,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceRefunded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRefunded {
    pub invoice_id: InvoiceId,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    InvoiceUpdated(InvoiceUpdated),
    InvoiceDeleted(InvoiceDeleted),
    InvoiceSent(InvoiceSent),
    PaymentRecorded(PaymentRecorded),
    PaymentReminderSent(PaymentReminderSent),
    InvoiceMarkedOverdue(InvoiceMarkedOverdue),
    InvoiceCancelled(InvoiceCancelled),
    InvoiceRefunded(InvoiceRefunded),
}

impl InvoiceEvent {
    pub fn invoice_id(&self) -> InvoiceId {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.invoice_id,
            InvoiceEvent::InvoiceUpdated(e) => e.invoice_id,
            InvoiceEvent::InvoiceDeleted(e) => e.invoice_id,
            InvoiceEvent::InvoiceSent(e) => e.invoice_id,
            InvoiceEvent::PaymentRecorded(e) => e.invoice_id,
            InvoiceEvent::PaymentReminderSent(e) => e.invoice_id,
            InvoiceEvent::InvoiceMarkedOverdue(e) => e.invoice_id,
            InvoiceEvent::InvoiceCancelled(e) => e.invoice_id,
            InvoiceEvent::InvoiceRefunded(e) => e.invoice_id,
        }
    }
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::InvoiceUpdated(_) => "invoicing.invoice.updated",
            InvoiceEvent::InvoiceDeleted(_) => "invoicing.invoice.deleted",
            InvoiceEvent::InvoiceSent(_) => "invoicing.invoice.sent",
            InvoiceEvent::PaymentRecorded(_) => "invoicing.invoice.payment_recorded",
            InvoiceEvent::PaymentReminderSent(_) => "invoicing.invoice.reminder_sent",
            InvoiceEvent::InvoiceMarkedOverdue(_) => "invoicing.invoice.overdue",
            InvoiceEvent::InvoiceCancelled(_) => "invoicing.invoice.cancelled",
            InvoiceEvent::InvoiceRefunded(_) => "invoicing.invoice.refunded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::InvoiceUpdated(e) => e.occurred_at,
            InvoiceEvent::InvoiceDeleted(e) => e.occurred_at,
            InvoiceEvent::InvoiceSent(e) => e.occurred_at,
            InvoiceEvent::PaymentRecorded(e) => e.occurred_at,
            InvoiceEvent::PaymentReminderSent(e) => e.occurred_at,
            InvoiceEvent::InvoiceMarkedOverdue(e) => e.occurred_at,
            InvoiceEvent::InvoiceCancelled(e) => e.occurred_at,
            InvoiceEvent::InvoiceRefunded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.invoice_number = Some(e.invoice_number);
                self.status = InvoiceStatus::Draft;
                self.currency = e.currency.clone();
                self.recipient = e.recipient.clone();
                self.line_items = e.line_items.clone();
                self.totals = e.totals;
                self.paid_amount = Decimal::ZERO;
                self.issue_date = e.issue_date;
                self.due_date = e.due_date;
                self.customer_id = e.customer_id.clone();
                self.booking_id = e.booking_id.clone();
                self.reference = e.reference.clone();
                self.notes = e.notes.clone();
                self.reminders_sent = 0;
                self.created_at = e.occurred_at;
                self.created = true;
            }
            InvoiceEvent::InvoiceUpdated(e) => {
                self.recipient = e.recipient.clone();
                self.line_items = e.line_items.clone();
                self.totals = e.totals;
                self.due_date = e.due_date;
                self.customer_id = e.customer_id.clone();
                self.booking_id = e.booking_id.clone();
                self.reference = e.reference.clone();
                self.notes = e.notes.clone();
            }
            InvoiceEvent::InvoiceDeleted(_) => {
                self.created = false;
            }
            InvoiceEvent::InvoiceSent(e) => {
                self.status = e.status;
                self.sent_at = Some(e.occurred_at);
            }
            InvoiceEvent::PaymentRecorded(e) => {
                self.paid_amount = e.new_paid_amount;
                self.payment_details = Some(e.payment.details());
                self.payments.push(e.payment.clone());
                if e.fully_paid {
                    self.status = InvoiceStatus::Paid;
                    self.paid_date = Some(e.payment.paid_date);
                }
            }
            InvoiceEvent::PaymentReminderSent(e) => {
                self.reminders_sent += 1;
                self.last_reminder_date = Some(e.reminder_date);
            }
            InvoiceEvent::InvoiceMarkedOverdue(_) => {
                self.status = InvoiceStatus::Overdue;
            }
            InvoiceEvent::InvoiceCancelled(e) => {
                self.status = InvoiceStatus::Cancelled;
                self.cancelled_at = Some(e.occurred_at);
                self.cancellation_reason = e.reason.clone();
            }
            InvoiceEvent::InvoiceRefunded(e) => {
                self.status = InvoiceStatus::Refunded;
                self.refunded_amount = e.amount;
                self.refunded_at = Some(e.occurred_at);
                self.refund_reason = e.reason.clone();
            }
        }

        self.updated_at = event.occurred_at();
        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::UpdateInvoice(cmd) => self.handle_update(cmd),
            InvoiceCommand::DeleteInvoice(cmd) => self.handle_delete(cmd),
            InvoiceCommand::SendInvoice(cmd) => self.handle_send(cmd),
            InvoiceCommand::RecordPayment(cmd) => self.handle_record_payment(cmd),
            InvoiceCommand::SendPaymentReminder(cmd) => self.handle_reminder(cmd),
            InvoiceCommand::MarkOverdue(cmd) => self.handle_mark_overdue(cmd),
            InvoiceCommand::CancelInvoice(cmd) => self.handle_cancel(cmd),
            InvoiceCommand::RefundInvoice(cmd) => self.handle_refund(cmd),
        }
    }
}

/// Validate and build line items; errors name `line_items[i].<field>`.
fn build_line_items(inputs: &[LineItemInput]) -> DomainResult<Vec<InvoiceLineItem>> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            input.validate(index)?;
            Ok(InvoiceLineItem::from(input.clone()))
        })
        .collect()
}

/// Totals with a discount that is neither negative nor larger than the gross.
fn checked_totals(line_items: &[InvoiceLineItem], discount: Decimal) -> DomainResult<InvoiceTotals> {
    if discount < Decimal::ZERO {
        return Err(DomainError::validation(
            "discount_amount",
            "must not be negative",
        ));
    }
    let totals = checked_invoice_totals(line_items, Some(discount)).ok_or_else(|| {
        DomainError::validation("line_items", "invoice total is too large")
    })?;
    if totals.total_amount < Decimal::ZERO {
        return Err(DomainError::validation(
            "discount_amount",
            format!("exceeds the invoice total {}", totals.gross_amount()),
        ));
    }
    Ok(totals)
}

/// Trimmed text; blank becomes `None`.
fn clean_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Patch semantics for optional text: absent keeps, blank clears.
fn patch_text(new: &Option<String>, old: &Option<String>) -> Option<String> {
    match new {
        Some(_) => clean_text(new),
        None => old.clone(),
    }
}

impl Invoice {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    fn ensure_target(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        self.ensure_created()?;
        self.ensure_invoice_id(invoice_id)
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        self.ensure_invoice_id(cmd.invoice_id)?;

        let recipient = cmd.recipient.normalized();
        recipient.validate()?;

        let line_items = build_line_items(&cmd.line_items)?;
        let totals = checked_totals(&line_items, cmd.discount_amount.unwrap_or(Decimal::ZERO))?;

        let currency = cmd.currency.trim().to_ascii_uppercase();
        if currency.is_empty() {
            return Err(DomainError::validation("currency", "must not be empty"));
        }

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            invoice_id: cmd.invoice_id,
            invoice_number: cmd.invoice_number,
            currency,
            recipient,
            line_items,
            totals,
            issue_date: cmd.issue_date,
            due_date: cmd.due_date,
            customer_id: clean_text(&cmd.customer_id),
            booking_id: clean_text(&cmd.booking_id),
            reference: clean_text(&cmd.reference),
            notes: clean_text(&cmd.notes),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.invoice_id)?;

        if self.status.is_content_locked() {
            return Err(DomainError::invalid_state(format!(
                "cannot update a {} invoice",
                self.status
            )));
        }

        let patch = &cmd.patch;

        let recipient = match &patch.recipient {
            Some(recipient_patch) => self.recipient.merge(recipient_patch),
            None => self.recipient.clone(),
        };
        recipient.validate()?;

        let line_items = match &patch.line_items {
            Some(inputs) => build_line_items(inputs)?,
            None => self.line_items.clone(),
        };
        let discount = patch
            .discount_amount
            .unwrap_or(self.totals.discount_amount);
        let totals = checked_totals(&line_items, discount)?;

        // Only a payment may settle an invoice.
        if self.paid_amount > Decimal::ZERO && totals.total_amount <= self.paid_amount {
            let field = if patch.line_items.is_some() {
                "line_items"
            } else {
                "discount_amount"
            };
            return Err(DomainError::validation(
                field,
                format!(
                    "new total {} must stay above the amount already paid {}",
                    totals.total_amount, self.paid_amount
                ),
            ));
        }

        Ok(vec![InvoiceEvent::InvoiceUpdated(InvoiceUpdated {
            invoice_id: cmd.invoice_id,
            recipient,
            line_items,
            totals,
            due_date: patch.due_date.unwrap_or(self.due_date),
            customer_id: patch_text(&patch.customer_id, &self.customer_id),
            booking_id: patch_text(&patch.booking_id, &self.booking_id),
            reference: patch_text(&patch.reference, &self.reference),
            notes: patch_text(&patch.notes, &self.notes),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.invoice_id)?;

        if self.status != InvoiceStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "only draft invoices can be deleted (status: {})",
                self.status
            )));
        }
        let invoice_number = self
            .invoice_number
            .ok_or_else(|| DomainError::invariant("created invoice has no number"))?;

        Ok(vec![InvoiceEvent::InvoiceDeleted(InvoiceDeleted {
            invoice_id: cmd.invoice_id,
            invoice_number,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_send(&self, cmd: &SendInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.invoice_id)?;

        if matches!(
            self.status,
            InvoiceStatus::Cancelled | InvoiceStatus::Refunded
        ) {
            return Err(DomainError::invalid_state(format!(
                "cannot send a {} invoice",
                self.status
            )));
        }

        let status = match self.status {
            InvoiceStatus::Draft => InvoiceStatus::Sent,
            other => other,
        };

        Ok(vec![InvoiceEvent::InvoiceSent(InvoiceSent {
            invoice_id: cmd.invoice_id,
            previous_status: self.status,
            status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_payment(&self, cmd: &RecordPayment) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.invoice_id)?;

        if matches!(
            self.status,
            InvoiceStatus::Cancelled | InvoiceStatus::Refunded
        ) {
            return Err(DomainError::invalid_state(format!(
                "cannot record a payment on a {} invoice",
                self.status
            )));
        }
        cmd.payment.validate()?;

        let total = self.totals.total_amount;
        let new_paid_amount = self
            .paid_amount
            .checked_add(cmd.payment.amount)
            .ok_or_else(|| DomainError::validation("amount", "paid amount would exceed the supported range"))?;

        if cmd.policy == OverpaymentPolicy::Reject && new_paid_amount > total {
            return Err(DomainError::Overpayment {
                outstanding: self.outstanding_amount(),
                attempted: cmd.payment.amount,
            });
        }

        Ok(vec![InvoiceEvent::PaymentRecorded(PaymentRecorded {
            invoice_id: cmd.invoice_id,
            payment: PaymentRecord::from_input(&cmd.payment, cmd.occurred_at),
            new_paid_amount,
            overpaid_amount: non_negative(new_paid_amount - total),
            fully_paid: new_paid_amount >= total && self.status != InvoiceStatus::Paid,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reminder(&self, cmd: &SendPaymentReminder) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.invoice_id)?;

        if self.status.is_content_locked() {
            return Err(DomainError::invalid_state(format!(
                "cannot send a payment reminder for a {} invoice",
                self.status
            )));
        }
        if cmd.reminder_level < 1 {
            return Err(DomainError::validation(
                "reminder_level",
                "must be at least 1",
            ));
        }

        Ok(vec![InvoiceEvent::PaymentReminderSent(PaymentReminderSent {
            invoice_id: cmd.invoice_id,
            reminder_level: cmd.reminder_level,
            reminder_date: cmd.reminder_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_overdue(&self, cmd: &MarkOverdue) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.invoice_id)?;

        // Only SENT invoices move; OVERDUE is never re-entered or left here.
        if !self.is_overdue_on(cmd.today) {
            return Ok(vec![]);
        }

        Ok(vec![InvoiceEvent::InvoiceMarkedOverdue(InvoiceMarkedOverdue {
            invoice_id: cmd.invoice_id,
            due_date: self.due_date,
            outstanding_amount: self.outstanding_amount(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.invoice_id)?;

        if !self.status.can_cancel() {
            return Err(DomainError::invalid_state(format!(
                "cannot cancel a {} invoice",
                self.status
            )));
        }

        Ok(vec![InvoiceEvent::InvoiceCancelled(InvoiceCancelled {
            invoice_id: cmd.invoice_id,
            previous_status: self.status,
            reason: clean_text(&cmd.reason),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_refund(&self, cmd: &RefundInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.invoice_id)?;

        if self.status != InvoiceStatus::Paid {
            return Err(DomainError::invalid_state(format!(
                "only paid invoices can be refunded (status: {})",
                self.status
            )));
        }

        let amount = cmd.amount.unwrap_or(self.paid_amount);
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("amount", "must be positive"));
        }
        if amount > self.paid_amount {
            return Err(DomainError::validation(
                "amount",
                format!("must not exceed the paid amount {}", self.paid_amount),
            ));
        }

        Ok(vec![InvoiceEvent::InvoiceRefunded(InvoiceRefunded {
            invoice_id: cmd.invoice_id,
            amount,
            reason: clean_text(&cmd.reason),
            occurred_at: cmd.occurred_at,
        })])
    }
}
