//! Integration tests for the invoice pipeline.
//!
//! Tests: Service → Aggregate → InvoiceStore → EventBus / Delivery
//!
//! Verifies:
//! - Operations produce the documented invoice state and totals
//! - Failures leave the store untouched
//! - Events are published after the write, in order
//! - Optimistic concurrency conflicts are detected
//! - The overdue sweep survives failures on single invoices

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration as StdDuration, Instant};

    use chrono::{Duration, NaiveDate, Utc};
    use rust_decimal::Decimal;

    use tourdesk_core::{Aggregate, AggregateRoot, Clock, ExpectedVersion, FixedClock};
    use tourdesk_events::{EventBus, InMemoryEventBus, Subscription};
    use tourdesk_invoicing::{
        Invoice, InvoiceCommand, InvoiceFilter, InvoiceId, InvoicePatch, InvoiceStatus,
        LineItemInput, OverpaymentPolicy, PaymentInput, PaymentMethod, Recipient, TaxRate,
        UpdateInvoice,
    };
    use tourdesk_reporting::ReportPeriod;

    use crate::config::EngineConfig;
    use crate::delivery::InMemoryOutbox;
    use crate::export::{DataExporter, ExportFormat};
    use crate::invoice_service::{
        DeliveryOptions, InvoiceEnvelope, InvoiceService, NewInvoice, RefundInput, ReminderInput,
        ServiceError,
    };
    use crate::invoice_store::{InMemoryInvoiceStore, InvoiceStore, StoreError};
    use crate::numbering::InMemoryInvoiceNumberSequence;
    use crate::workers::{OverdueSweeper, SweeperConfig};

    type Bus = Arc<InMemoryEventBus<InvoiceEnvelope>>;

    struct Harness<S> {
        service: InvoiceService<S, Bus>,
        bus: Bus,
        outbox: Arc<InMemoryOutbox>,
        clock: Arc<FixedClock>,
    }

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn setup_with<S>(store: S, config: EngineConfig) -> Harness<S> {
        let _ = tourdesk_observability::try_init();

        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let outbox = Arc::new(InMemoryOutbox::new());
        let clock = Arc::new(FixedClock::on(march_first()));
        let service = InvoiceService::new(
            store,
            bus.clone(),
            Arc::new(InMemoryInvoiceNumberSequence::new()),
            outbox.clone(),
        )
        .with_clock(clock.clone())
        .with_config(config);

        Harness {
            service,
            bus,
            outbox,
            clock,
        }
    }

    fn setup() -> Harness<Arc<InMemoryInvoiceStore>> {
        setup_with(Arc::new(InMemoryInvoiceStore::new()), EngineConfig::default())
    }

    fn tour() -> NewInvoice {
        NewInvoice::new(
            Recipient::new("Anna Berg", "anna@example.se"),
            vec![LineItemInput::new("Tour", 2, Decimal::from(12000), TaxRate::percent(12))],
        )
        .for_booking("CUST-1", "BK-2026-17")
    }

    fn payment(amount: i64) -> PaymentInput {
        PaymentInput::new(
            PaymentMethod::BankTransfer,
            Decimal::from(amount),
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
        )
    }

    fn assert_invalid_state<T: core::fmt::Debug>(result: Result<T, ServiceError>) {
        match result {
            Err(ServiceError::InvalidState(_)) => {}
            other => panic!("Expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn create_invoice_computes_totals_and_defaults() {
        let h = setup();
        let invoice = h.service.create_invoice(tour()).unwrap();

        assert_eq!(invoice.invoice_number().unwrap().to_string(), "INV-2026-001");
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.subtotal(), Decimal::from(24000));
        assert_eq!(invoice.total_tax(), Decimal::from(2880));
        assert_eq!(invoice.total_amount(), Decimal::from(26880));
        assert_eq!(invoice.issue_date(), march_first());
        assert_eq!(invoice.due_date(), NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
        assert_eq!(invoice.currency(), "SEK");
        assert_eq!(invoice.paid_amount(), Decimal::ZERO);
        assert_eq!(invoice.reminders_sent(), 0);

        assert_eq!(h.service.get_invoice(invoice.id_typed()).unwrap(), invoice);
    }

    #[test]
    fn full_payment_marks_paid() {
        let h = setup();
        let invoice = h.service.create_invoice(tour()).unwrap();
        h.service
            .send_invoice(invoice.id_typed(), DeliveryOptions::default())
            .unwrap();

        let paid = h.service.record_payment(invoice.id_typed(), payment(26880)).unwrap();
        assert_eq!(paid.status(), InvoiceStatus::Paid);
        assert_eq!(paid.paid_amount(), Decimal::from(26880));
        assert_eq!(paid.paid_date(), NaiveDate::from_ymd_opt(2026, 3, 10));
    }

    #[test]
    fn partial_payment_leaves_status_unchanged() {
        let h = setup();
        let invoice = h.service.create_invoice(tour()).unwrap();

        let partly = h.service.record_payment(invoice.id_typed(), payment(10000)).unwrap();
        assert_eq!(partly.status(), InvoiceStatus::Draft);
        assert_eq!(partly.paid_amount(), Decimal::from(10000));
        assert_eq!(partly.outstanding_amount(), Decimal::from(16880));
    }

    #[test]
    fn only_drafts_can_be_deleted_and_numbers_are_not_reused() {
        let h = setup();
        let sent = h.service.create_invoice(tour()).unwrap();
        h.service
            .send_invoice(sent.id_typed(), DeliveryOptions::default())
            .unwrap();
        assert_invalid_state(h.service.delete_invoice(sent.id_typed()));

        let draft = h.service.create_invoice(tour()).unwrap();
        h.service.delete_invoice(draft.id_typed()).unwrap();
        match h.service.get_invoice(draft.id_typed()) {
            Err(ServiceError::NotFound(id)) => assert_eq!(id, draft.id_typed()),
            other => panic!("Expected NotFound, got {other:?}"),
        }

        let next = h.service.create_invoice(tour()).unwrap();
        assert_eq!(next.invoice_number().unwrap().to_string(), "INV-2026-003");
    }

    #[test]
    fn discount_reduces_total() {
        let h = setup();
        let invoice = h
            .service
            .create_invoice(tour().with_discount(Decimal::from(5000)))
            .unwrap();
        assert_eq!(invoice.total_amount(), Decimal::from(21880));
    }

    #[test]
    fn overdue_sweep_transitions_once() {
        let h = setup();
        let invoice = h.service.create_invoice(tour()).unwrap();
        h.service
            .send_invoice(invoice.id_typed(), DeliveryOptions::default())
            .unwrap();
        let untouched = h.service.create_invoice(tour()).unwrap();

        let due = invoice.due_date();
        assert!(h.service.check_overdue_invoices(due).unwrap().is_empty());

        let today = due + Duration::days(1);
        let first = h.service.check_overdue_invoices(today).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id_typed(), invoice.id_typed());
        assert_eq!(first[0].status(), InvoiceStatus::Overdue);

        assert!(h.service.check_overdue_invoices(today).unwrap().is_empty());
        assert_eq!(
            h.service.get_invoice(untouched.id_typed()).unwrap().status(),
            InvoiceStatus::Draft
        );
    }

    #[test]
    fn validation_failure_writes_nothing_and_keeps_numbering() {
        let h = setup();
        let mut bad = tour();
        bad.recipient.email = String::new();

        match h.service.create_invoice(bad) {
            Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "recipient.email"),
            other => panic!("Expected Validation, got {other:?}"),
        }
        assert!(h.service.list_invoices(&InvoiceFilter::all()).unwrap().is_empty());

        let ok = h.service.create_invoice(tour()).unwrap();
        assert_eq!(ok.invoice_number().unwrap().to_string(), "INV-2026-001");
    }

    #[test]
    fn send_delivers_to_recipient() {
        let h = setup();
        let invoice = h.service.create_invoice(tour()).unwrap();
        let sent = h
            .service
            .send_invoice(invoice.id_typed(), DeliveryOptions::default())
            .unwrap();
        assert_eq!(sent.status(), InvoiceStatus::Sent);
        assert_eq!(sent.sent_at(), Some(h.clock.now()));

        let messages = h.outbox.sent();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].to, "anna@example.se");
        assert_eq!(messages[0].subject, "Invoice INV-2026-001 from Tourdesk Billing");
        assert!(messages[0].body.contains("Amount due: 26880.00 SEK"));
        assert!(messages[0].attach_pdf);
    }

    #[test]
    fn resend_keeps_status_and_honours_options() {
        let h = setup();
        let invoice = h.service.create_invoice(tour()).unwrap();
        let id = invoice.id_typed();
        h.service.send_invoice(id, DeliveryOptions::default()).unwrap();
        h.clock.advance(Duration::hours(3));

        let resent = h
            .service
            .send_invoice(
                id,
                DeliveryOptions {
                    to: Some("bookkeeping@example.se".to_string()),
                    attach_pdf: false,
                    ..DeliveryOptions::default()
                },
            )
            .unwrap();

        assert_eq!(resent.status(), InvoiceStatus::Sent);
        assert_eq!(resent.sent_at(), Some(h.clock.now()));
        let last = h.outbox.sent().pop().unwrap();
        assert_eq!(last.to, "bookkeeping@example.se");
        assert!(!last.attach_pdf);
    }

    #[test]
    fn delivery_failure_leaves_invoice_unchanged() {
        let h = setup();
        let invoice = h.service.create_invoice(tour()).unwrap();
        h.outbox.set_failing(true);

        match h.service.send_invoice(invoice.id_typed(), DeliveryOptions::default()) {
            Err(ServiceError::Delivery(_)) => {}
            other => panic!("Expected Delivery error, got {other:?}"),
        }
        let stored = h.service.get_invoice(invoice.id_typed()).unwrap();
        assert_eq!(stored.status(), InvoiceStatus::Draft);
        assert_eq!(stored.version(), invoice.version());
    }

    #[test]
    fn reminders_count_and_are_blocked_once_paid() {
        let h = setup();
        let id = h.service.create_invoice(tour()).unwrap().id_typed();
        h.service.send_invoice(id, DeliveryOptions::default()).unwrap();

        let today = h.service.clock().today();
        assert_eq!(today, march_first());
        h.service.send_payment_reminder(id, ReminderInput::level(1)).unwrap();
        let reminded = h.service.send_payment_reminder(id, ReminderInput::level(2)).unwrap();
        assert_eq!(reminded.reminders_sent(), 2);
        assert_eq!(reminded.last_reminder_date(), Some(today));
        assert!(h.outbox.sent()[2].subject.starts_with("Payment reminder 2:"));

        h.service.record_payment(id, payment(26880)).unwrap();
        let before = h.outbox.len();
        assert_invalid_state(h.service.send_payment_reminder(id, ReminderInput::level(3)));
        assert_invalid_state(h.service.update_invoice(id, InvoicePatch::default()));
        assert_eq!(h.outbox.len(), before);
    }

    #[test]
    fn overpayment_policy_is_configurable() {
        let accepting = setup();
        let id = accepting.service.create_invoice(tour()).unwrap().id_typed();
        let invoice = accepting.service.record_payment(id, payment(30000)).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert_eq!(invoice.overpaid_amount(), Decimal::from(3120));

        let rejecting = setup_with(
            Arc::new(InMemoryInvoiceStore::new()),
            EngineConfig::default().with_overpayment_policy(OverpaymentPolicy::Reject),
        );
        let id = rejecting.service.create_invoice(tour()).unwrap().id_typed();
        match rejecting.service.record_payment(id, payment(30000)) {
            Err(ServiceError::Overpayment { outstanding, attempted }) => {
                assert_eq!(outstanding, Decimal::from(26880));
                assert_eq!(attempted, Decimal::from(30000));
            }
            other => panic!("Expected Overpayment, got {other:?}"),
        }
        assert_eq!(
            rejecting.service.get_invoice(id).unwrap().paid_amount(),
            Decimal::ZERO
        );
    }

    #[test]
    fn cancel_and_refund_lifecycle() {
        let h = setup();
        let cancelled = h.service.create_invoice(tour()).unwrap().id_typed();
        let invoice = h
            .service
            .cancel_invoice(cancelled, Some("Tour cancelled".to_string()))
            .unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Cancelled);
        assert_invalid_state(h.service.record_payment(cancelled, payment(1)));
        assert_invalid_state(h.service.send_invoice(cancelled, DeliveryOptions::default()));

        let paid = h.service.create_invoice(tour()).unwrap().id_typed();
        assert_invalid_state(h.service.refund_invoice(paid, RefundInput::default()));
        h.service.record_payment(paid, payment(26880)).unwrap();
        assert_invalid_state(h.service.cancel_invoice(paid, None));

        let refunded = h
            .service
            .refund_invoice(
                paid,
                RefundInput {
                    amount: Some(Decimal::from(10000)),
                    reason: Some("Partial weather refund".to_string()),
                },
            )
            .unwrap();
        assert_eq!(refunded.status(), InvoiceStatus::Refunded);
        assert_eq!(refunded.refunded_amount(), Decimal::from(10000));
    }

    #[test]
    fn events_are_published_in_order_after_each_write() {
        let h = setup();
        let subscription = h.bus.subscribe();

        let id = h.service.create_invoice(tour()).unwrap().id_typed();
        h.service.send_invoice(id, DeliveryOptions::default()).unwrap();
        h.service.record_payment(id, payment(26880)).unwrap();

        let envelopes = subscription.drain();
        let kinds: Vec<&str> = envelopes.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            kinds,
            vec![
                "invoicing.invoice.created",
                "invoicing.invoice.sent",
                "invoicing.invoice.payment_recorded"
            ]
        );
        let sequence: Vec<u64> = envelopes.iter().map(|e| e.sequence_number()).collect();
        assert_eq!(sequence, vec![1, 2, 3]);
        assert!(envelopes.iter().all(|e| e.aggregate_id() == id.0));

        // Nothing is published for a rejected command.
        let _ = h.service.delete_invoice(id);
        assert!(subscription.drain().is_empty());
    }

    /// Store that lets a second writer commit just before the first replace.
    struct RacingStore {
        inner: InMemoryInvoiceStore,
        raced: AtomicBool,
    }

    impl InvoiceStore for RacingStore {
        fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, StoreError> {
            self.inner.list(filter)
        }

        fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
            self.inner.get(id)
        }

        fn append(&self, invoice: Invoice) -> Result<(), StoreError> {
            self.inner.append(invoice)
        }

        fn replace(&self, invoice: Invoice, expected: ExpectedVersion) -> Result<(), StoreError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                let id = invoice.id_typed();
                let mut other = self.inner.get(id)?.ok_or(StoreError::NotFound(id))?;
                let version = other.version();
                other
                    .execute(&InvoiceCommand::UpdateInvoice(UpdateInvoice {
                        invoice_id: id,
                        patch: InvoicePatch {
                            notes: Some("edited in another tab".to_string()),
                            ..InvoicePatch::default()
                        },
                        occurred_at: Utc::now(),
                    }))
                    .unwrap();
                self.inner.replace(other, ExpectedVersion::Exact(version))?;
            }
            self.inner.replace(invoice, expected)
        }

        fn remove(&self, id: InvoiceId, expected: ExpectedVersion) -> Result<Invoice, StoreError> {
            self.inner.remove(id, expected)
        }
    }

    #[test]
    fn concurrent_write_is_reported_as_conflict() {
        let store = RacingStore {
            inner: InMemoryInvoiceStore::new(),
            raced: AtomicBool::new(false),
        };
        let h = setup_with(store, EngineConfig::default());
        let subscription = h.bus.subscribe();
        let id = h.service.create_invoice(tour()).unwrap().id_typed();

        match h.service.record_payment(id, payment(26880)) {
            Err(ServiceError::Conflict(_)) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }

        let stored = h.service.get_invoice(id).unwrap();
        assert_eq!(stored.paid_amount(), Decimal::ZERO);
        assert_eq!(stored.notes(), Some("edited in another tab"));
        // Only the creation was published.
        assert_eq!(subscription.drain().len(), 1);

        // Retrying against the fresh state succeeds.
        let paid = h.service.record_payment(id, payment(26880)).unwrap();
        assert_eq!(paid.status(), InvoiceStatus::Paid);
    }

    #[test]
    fn conflict_after_delivery_resends_on_retry() {
        let store = RacingStore {
            inner: InMemoryInvoiceStore::new(),
            raced: AtomicBool::new(false),
        };
        let h = setup_with(store, EngineConfig::default());
        let id = h.service.create_invoice(tour()).unwrap().id_typed();

        match h.service.send_invoice(id, DeliveryOptions::default()) {
            Err(ServiceError::Conflict(_)) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
        // Delivered, but the write lost the race.
        assert_eq!(h.outbox.sent().len(), 1);
        let stored = h.service.get_invoice(id).unwrap();
        assert_eq!(stored.status(), InvoiceStatus::Draft);
        assert_eq!(stored.sent_at(), None);

        let sent = h.service.send_invoice(id, DeliveryOptions::default()).unwrap();
        assert_eq!(sent.status(), InvoiceStatus::Sent);
        assert_eq!(h.outbox.sent().len(), 2);
    }

    #[test]
    fn summary_and_export_cover_the_period() {
        let h = setup();
        let a = h.service.create_invoice(tour()).unwrap().id_typed();
        h.service.record_payment(a, payment(26880)).unwrap();
        h.service
            .create_invoice(tour().with_discount(Decimal::from(880)))
            .unwrap();
        let cancelled = h.service.create_invoice(tour()).unwrap().id_typed();
        h.service.cancel_invoice(cancelled, None).unwrap();

        let summary = h
            .service
            .summarize(ReportPeriod::ThisMonth, march_first())
            .unwrap();
        assert_eq!(summary.invoice_count, 3);
        assert_eq!(summary.by_status.cancelled, 1);
        assert_eq!(summary.total_invoiced, Decimal::from(26880 + 26000));
        assert_eq!(summary.total_paid, Decimal::from(26880));

        let last_month = h
            .service
            .summarize(ReportPeriod::LastMonth, march_first())
            .unwrap();
        assert_eq!(last_month.invoice_count, 0);

        let csv = h
            .service
            .export_invoices(
                &InvoiceFilter::all().with_status(InvoiceStatus::Paid),
                ExportFormat::Csv,
                &DataExporter,
            )
            .unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("INV-2026-001,PAID"));

        assert!(matches!(
            h.service.export_summary(
                ReportPeriod::ThisMonth,
                march_first(),
                ExportFormat::Pdf,
                &DataExporter
            ),
            Err(ServiceError::Export(_))
        ));
    }

    #[test]
    fn sweeper_marks_overdue_in_background() {
        let h = setup();
        let id = h.service.create_invoice(tour()).unwrap().id_typed();
        h.service.send_invoice(id, DeliveryOptions::default()).unwrap();
        h.clock.advance(Duration::days(45));

        let clock = h.clock.clone();
        let service = Arc::new(h.service);
        let worker = OverdueSweeper::spawn(
            service.clone(),
            SweeperConfig {
                interval: StdDuration::from_millis(20),
                run_immediately: true,
            },
        )
        .unwrap();

        let deadline = Instant::now() + StdDuration::from_secs(2);
        while service.get_invoice(id).unwrap().status() != InvoiceStatus::Overdue {
            assert!(Instant::now() < deadline, "sweeper did not mark the invoice overdue");
            std::thread::sleep(StdDuration::from_millis(10));
        }

        worker.shutdown();
        assert_eq!(
            service.get_invoice(id).unwrap().updated_at(),
            clock.now()
        );
    }

    /// Store whose writes for one invoice fail as if the backend were down.
    struct FlakyStore {
        inner: InMemoryInvoiceStore,
        broken: Mutex<Option<InvoiceId>>,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: InMemoryInvoiceStore::new(),
                broken: Mutex::new(None),
            }
        }

        fn break_writes_for(&self, id: InvoiceId) {
            *self.broken.lock().unwrap() = Some(id);
        }

        fn heal(&self) {
            *self.broken.lock().unwrap() = None;
        }
    }

    impl InvoiceStore for FlakyStore {
        fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, StoreError> {
            self.inner.list(filter)
        }

        fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
            self.inner.get(id)
        }

        fn append(&self, invoice: Invoice) -> Result<(), StoreError> {
            self.inner.append(invoice)
        }

        fn replace(&self, invoice: Invoice, expected: ExpectedVersion) -> Result<(), StoreError> {
            if *self.broken.lock().unwrap() == Some(invoice.id_typed()) {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            self.inner.replace(invoice, expected)
        }

        fn remove(&self, id: InvoiceId, expected: ExpectedVersion) -> Result<Invoice, StoreError> {
            self.inner.remove(id, expected)
        }
    }

    #[test]
    fn overdue_sweep_skips_invoices_that_fail_to_write() {
        let store = Arc::new(FlakyStore::new());
        let h = setup_with(store.clone(), EngineConfig::default());

        let mut ids = Vec::new();
        for _ in 0..3 {
            let id = h.service.create_invoice(tour()).unwrap().id_typed();
            h.service.send_invoice(id, DeliveryOptions::default()).unwrap();
            ids.push(id);
        }
        store.break_writes_for(ids[1]);

        let today = march_first() + Duration::days(45);
        let transitioned = h.service.check_overdue_invoices(today).unwrap();
        let mut marked: Vec<InvoiceId> = transitioned.iter().map(|i| i.id_typed()).collect();
        marked.sort();
        let mut expected = vec![ids[0], ids[2]];
        expected.sort();
        assert_eq!(marked, expected);
        assert_eq!(
            h.service.get_invoice(ids[1]).unwrap().status(),
            InvoiceStatus::Sent
        );

        // The next sweep picks it up once the store recovers.
        store.heal();
        let retried = h.service.check_overdue_invoices(today).unwrap();
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].id_typed(), ids[1]);
    }

    /// Bus that drops overdue notifications and passes everything else on.
    struct OverdueDroppingBus {
        inner: InMemoryEventBus<InvoiceEnvelope>,
    }

    impl EventBus<InvoiceEnvelope> for OverdueDroppingBus {
        type Error = String;

        fn publish(&self, message: InvoiceEnvelope) -> Result<(), Self::Error> {
            if message.event_type() == "invoicing.invoice.overdue" {
                return Err("broker offline".to_string());
            }
            self.inner.publish(message).map_err(|e| format!("{e:?}"))
        }

        fn subscribe(&self) -> Subscription<InvoiceEnvelope> {
            self.inner.subscribe()
        }
    }

    #[test]
    fn overdue_sweep_counts_writes_whose_publish_failed() {
        let _ = tourdesk_observability::try_init();
        let service = InvoiceService::new(
            Arc::new(InMemoryInvoiceStore::new()),
            OverdueDroppingBus {
                inner: InMemoryEventBus::new(),
            },
            Arc::new(InMemoryInvoiceNumberSequence::new()),
            Arc::new(InMemoryOutbox::new()),
        )
        .with_clock(Arc::new(FixedClock::on(march_first())));

        let mut ids = Vec::new();
        for _ in 0..2 {
            let id = service.create_invoice(tour()).unwrap().id_typed();
            service.send_invoice(id, DeliveryOptions::default()).unwrap();
            ids.push(id);
        }

        let today = march_first() + Duration::days(45);
        let transitioned = service.check_overdue_invoices(today).unwrap();
        assert_eq!(transitioned.len(), 2);
        for id in ids {
            assert_eq!(service.get_invoice(id).unwrap().status(), InvoiceStatus::Overdue);
        }
        assert!(service.check_overdue_invoices(today).unwrap().is_empty());
    }
}
