use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tourdesk_core::money::{checked_percent_of, percent_of};
use tourdesk_core::{DomainError, DomainResult};

use crate::tax::TaxRate;

/// Monetary amounts derived from a line item's inputs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemAmounts {
    /// `quantity × unit_price`.
    pub amount: Decimal,
    /// `amount × tax_rate / 100`.
    pub tax_amount: Decimal,
    /// `amount + tax_amount`.
    pub total: Decimal,
}

/// Compute the derived amounts of a single line item.
///
/// Inputs are expected to be validated by the caller. No rounding happens here.
/// Amounts saturate at the bounds of `Decimal`; validated inputs never reach
/// them (see [`checked_line_item`]).
pub fn compute_line_item(quantity: u32, unit_price: Decimal, tax_rate: TaxRate) -> LineItemAmounts {
    let amount = Decimal::from(quantity).saturating_mul(unit_price);
    let tax_amount = percent_of(amount, tax_rate.as_percent());
    LineItemAmounts {
        amount,
        tax_amount,
        total: amount.saturating_add(tax_amount),
    }
}

/// Like [`compute_line_item`], but `None` when an amount does not fit in a
/// `Decimal`.
pub fn checked_line_item(quantity: u32, unit_price: Decimal, tax_rate: TaxRate) -> Option<LineItemAmounts> {
    let amount = Decimal::from(quantity).checked_mul(unit_price)?;
    let tax_amount = checked_percent_of(amount, tax_rate.as_percent())?;
    Some(LineItemAmounts {
        amount,
        tax_amount,
        total: amount.checked_add(tax_amount)?,
    })
}

/// Caller-supplied line item (inputs only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_rate: TaxRate,
}

impl LineItemInput {
    pub fn new(
        description: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
        tax_rate: TaxRate,
    ) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            tax_rate,
        }
    }

    /// Validate the inputs of the line at `index`; errors name the offending
    /// field as `line_items[index].<field>`.
    pub fn validate(&self, index: usize) -> DomainResult<()> {
        let field = |name: &str| format!("line_items[{index}].{name}");

        if self.description.trim().is_empty() {
            return Err(DomainError::validation(
                field("description"),
                "must not be empty",
            ));
        }
        if self.quantity < 1 {
            return Err(DomainError::validation(
                field("quantity"),
                "must be at least 1",
            ));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(DomainError::validation(
                field("unit_price"),
                "must not be negative",
            ));
        }
        if self.tax_rate.as_percent() < Decimal::ZERO {
            return Err(DomainError::validation(
                field("tax_rate"),
                "must not be negative",
            ));
        }
        if checked_line_item(self.quantity, self.unit_price, self.tax_rate).is_none() {
            return Err(DomainError::validation(
                field("unit_price"),
                "is too large for the quantity and tax rate",
            ));
        }
        Ok(())
    }
}

/// A billable row of an invoice.
///
/// Derived amounts are computed on construction and cannot be set directly;
/// changing an input means building a new line item. Deserialization goes
/// through [`LineItemInput`], so stored derived values are always recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LineItemInput")]
pub struct InvoiceLineItem {
    description: String,
    quantity: u32,
    unit_price: Decimal,
    tax_rate: TaxRate,
    amount: Decimal,
    tax_amount: Decimal,
    total: Decimal,
}

impl From<LineItemInput> for InvoiceLineItem {
    fn from(input: LineItemInput) -> Self {
        let amounts = compute_line_item(input.quantity, input.unit_price, input.tax_rate);
        Self {
            description: input.description.trim().to_string(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            tax_rate: input.tax_rate,
            amount: amounts.amount,
            tax_amount: amounts.tax_amount,
            total: amounts.total,
        }
    }
}

impl InvoiceLineItem {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn amounts(&self) -> LineItemAmounts {
        LineItemAmounts {
            amount: self.amount,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }

    /// The inputs this line was built from.
    pub fn to_input(&self) -> LineItemInput {
        LineItemInput {
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax_rate: self.tax_rate,
        }
    }
}
