use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tourdesk_core::{DomainError, DomainResult};

/// VAT rate applied to a line item, as a percentage (`12` means 12 %).
///
/// The back office offers [`TaxRate::STANDARD_PERCENTAGES`], but any
/// non-negative percentage is accepted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Rates offered by the invoice editor.
    pub const STANDARD_PERCENTAGES: [u32; 4] = [0, 6, 12, 25];

    pub fn new(percent: Decimal) -> DomainResult<Self> {
        if percent < Decimal::ZERO {
            return Err(DomainError::validation("tax_rate", "must not be negative"));
        }
        Ok(Self(percent))
    }

    /// Whole-number percentage; always valid.
    pub fn percent(percent: u32) -> Self {
        Self(Decimal::from(percent))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The rates offered by the invoice editor.
    pub fn standard_rates() -> [TaxRate; 4] {
        Self::STANDARD_PERCENTAGES.map(Self::percent)
    }

    pub fn as_percent(&self) -> Decimal {
        self.0
    }

    pub fn is_standard(&self) -> bool {
        Self::standard_rates().contains(self)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self::zero()
    }
}

impl core::fmt::Display for TaxRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}
