use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tourdesk_core::DomainError;

/// Invoice status lifecycle.
///
/// ```text
/// DRAFT   ─send─────────────▶ SENT
/// SENT    ─overdue sweep────▶ OVERDUE
/// any open ─paid ≥ total────▶ PAID
/// DRAFT | SENT | OVERDUE ─cancel─▶ CANCELLED
/// PAID    ─refund───────────▶ REFUNDED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
    Refunded,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 6] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
        InvoiceStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Cancelled => "CANCELLED",
            InvoiceStatus::Refunded => "REFUNDED",
        }
    }

    /// No further lifecycle transition except `PAID → REFUNDED`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Paid | InvoiceStatus::Cancelled | InvoiceStatus::Refunded
        )
    }

    /// Recipient, lines, due date and discount can no longer change.
    pub fn is_content_locked(&self) -> bool {
        self.is_terminal()
    }

    /// Whether an invoice in this status may be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Overdue
        )
    }

    /// Whether money is expected for an invoice in this status.
    pub fn is_receivable(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation("status", format!("unknown status: {s}")))
    }
}
