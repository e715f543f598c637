//! Outbound delivery of invoices and reminders (email/notification port).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A plain-text message addressed to an invoice recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attach_pdf: bool,
}

/// Proof of hand-off to the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: Uuid,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The channel refused this message (bad address, content rejected).
    #[error("delivery rejected: {0}")]
    Rejected(String),

    /// The channel could not be reached.
    #[error("delivery channel unavailable: {0}")]
    Unavailable(String),
}

pub trait Delivery: Send + Sync {
    fn send(&self, message: &DeliveryMessage) -> Result<DeliveryReceipt, DeliveryError>;
}

impl<D> Delivery for Arc<D>
where
    D: Delivery + ?Sized,
{
    fn send(&self, message: &DeliveryMessage) -> Result<DeliveryReceipt, DeliveryError> {
        (**self).send(message)
    }
}

/// Records every accepted message instead of sending it (tests/dev).
///
/// `set_failing(true)` makes every subsequent `send` fail with
/// `DeliveryError::Unavailable`.
#[derive(Debug, Default)]
pub struct InMemoryOutbox {
    sent: Mutex<Vec<DeliveryMessage>>,
    failing: AtomicBool,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of accepted messages, oldest first.
    pub fn sent(&self) -> Vec<DeliveryMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Delivery for InMemoryOutbox {
    fn send(&self, message: &DeliveryMessage) -> Result<DeliveryReceipt, DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Unavailable("outbox switched to failing".to_string()));
        }
        if !message.to.contains('@') {
            return Err(DeliveryError::Rejected(format!("invalid address: {}", message.to)));
        }

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| DeliveryError::Unavailable("lock poisoned".to_string()))?;
        sent.push(message.clone());

        Ok(DeliveryReceipt {
            message_id: Uuid::now_v7(),
            accepted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> DeliveryMessage {
        DeliveryMessage {
            to: to.to_string(),
            subject: "Invoice INV-2026-001".to_string(),
            body: "Please find your invoice attached.".to_string(),
            attach_pdf: true,
        }
    }

    #[test]
    fn records_accepted_messages() {
        let outbox = InMemoryOutbox::new();
        outbox.send(&message("anna@example.se")).unwrap();
        assert_eq!(outbox.sent(), vec![message("anna@example.se")]);
    }

    #[test]
    fn failing_outbox_records_nothing() {
        let outbox = InMemoryOutbox::new();
        outbox.set_failing(true);
        match outbox.send(&message("anna@example.se")) {
            Err(DeliveryError::Unavailable(_)) => {}
            other => panic!("Expected Unavailable, got {other:?}"),
        }
        assert!(outbox.is_empty());

        outbox.set_failing(false);
        assert!(outbox.send(&message("anna@example.se")).is_ok());
    }

    #[test]
    fn rejects_addresses_without_at_sign() {
        let outbox = InMemoryOutbox::new();
        assert!(matches!(
            outbox.send(&message("nobody")),
            Err(DeliveryError::Rejected(_))
        ));
    }
}
