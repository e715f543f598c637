use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tourdesk_core::{DomainError, DomainResult};

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    Swish,
    Cash,
    Other,
}

/// Payment as entered by a back-office user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub paid_date: NaiveDate,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl PaymentInput {
    pub fn new(method: PaymentMethod, amount: Decimal, paid_date: NaiveDate) -> Self {
        Self {
            method,
            amount,
            paid_date,
            transaction_id: None,
            reference: None,
        }
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::validation("amount", "must be positive"));
        }
        Ok(())
    }

    pub fn details(&self) -> PaymentDetails {
        PaymentDetails {
            method: self.method,
            transaction_id: self.transaction_id.clone(),
            reference: self.reference.clone(),
        }
    }
}

/// The most recent payment's metadata (single slot on the invoice).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub reference: Option<String>,
}

/// One entry of the append-only payment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub paid_date: NaiveDate,
    pub transaction_id: Option<String>,
    pub reference: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn from_input(input: &PaymentInput, recorded_at: DateTime<Utc>) -> Self {
        Self {
            method: input.method,
            amount: input.amount,
            paid_date: input.paid_date,
            transaction_id: input.transaction_id.clone(),
            reference: input.reference.clone(),
            recorded_at,
        }
    }

    pub fn details(&self) -> PaymentDetails {
        PaymentDetails {
            method: self.method,
            transaction_id: self.transaction_id.clone(),
            reference: self.reference.clone(),
        }
    }
}

/// What to do with a payment that would push the paid amount above the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverpaymentPolicy {
    /// Record it unchanged and report the excess as `overpaid_amount`.
    #[default]
    Accept,
    /// Fail with [`DomainError::Overpayment`].
    Reject,
}

impl FromStr for OverpaymentPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            other => Err(DomainError::validation(
                "overpayment_policy",
                format!("expected `accept` or `reject`, got `{other}`"),
            )),
        }
    }
}
