use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::line_item::InvoiceLineItem;

/// Invoice-level aggregates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Σ line amounts (before tax).
    pub subtotal: Decimal,
    /// Σ line tax amounts.
    pub total_tax: Decimal,
    pub discount_amount: Decimal,
    /// `subtotal + total_tax − discount_amount`.
    pub total_amount: Decimal,
}

impl InvoiceTotals {
    /// Total before the discount is taken off.
    pub fn gross_amount(&self) -> Decimal {
        self.subtotal.saturating_add(self.total_tax)
    }
}

/// Compute invoice aggregates from its lines and an optional discount.
///
/// Pure: the same inputs always give the same totals. The discount reduces
/// `total_amount` only. Sums saturate at the bounds of `Decimal`; use
/// [`checked_invoice_totals`] where overflow must be reported.
pub fn compute_invoice_totals<'a, I>(line_items: I, discount_amount: Option<Decimal>) -> InvoiceTotals
where
    I: IntoIterator<Item = &'a InvoiceLineItem>,
{
    let (subtotal, total_tax) = line_items
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(sub, tax), line| {
            (sub.saturating_add(line.amount()), tax.saturating_add(line.tax_amount()))
        });
    let discount_amount = discount_amount.unwrap_or(Decimal::ZERO);

    InvoiceTotals {
        subtotal,
        total_tax,
        discount_amount,
        total_amount: subtotal.saturating_add(total_tax).saturating_sub(discount_amount),
    }
}

/// Like [`compute_invoice_totals`], but `None` when a sum does not fit in a
/// `Decimal`.
pub fn checked_invoice_totals<'a, I>(line_items: I, discount_amount: Option<Decimal>) -> Option<InvoiceTotals>
where
    I: IntoIterator<Item = &'a InvoiceLineItem>,
{
    let mut subtotal = Decimal::ZERO;
    let mut total_tax = Decimal::ZERO;
    for line in line_items {
        subtotal = subtotal.checked_add(line.amount())?;
        total_tax = total_tax.checked_add(line.tax_amount())?;
    }
    let discount_amount = discount_amount.unwrap_or(Decimal::ZERO);

    Some(InvoiceTotals {
        subtotal,
        total_tax,
        discount_amount,
        total_amount: subtotal.checked_add(total_tax)?.checked_sub(discount_amount)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::LineItemInput;
    use crate::tax::TaxRate;
    use proptest::prelude::*;

    fn line(quantity: u32, price: i64, rate: u32) -> InvoiceLineItem {
        InvoiceLineItem::from(LineItemInput::new(
            "Line",
            quantity,
            Decimal::from(price),
            TaxRate::percent(rate),
        ))
    }

    #[test]
    fn tour_invoice_totals() {
        let lines = vec![line(2, 12000, 12)];
        let totals = compute_invoice_totals(&lines, None);
        assert_eq!(totals.subtotal, Decimal::from(24000));
        assert_eq!(totals.total_tax, Decimal::from(2880));
        assert_eq!(totals.total_amount, Decimal::from(26880));
    }

    #[test]
    fn discount_reduces_total_only() {
        let lines = vec![line(2, 12000, 12)];
        let totals = compute_invoice_totals(&lines, Some(Decimal::from(5000)));
        assert_eq!(totals.subtotal, Decimal::from(24000));
        assert_eq!(totals.total_tax, Decimal::from(2880));
        assert_eq!(totals.total_amount, Decimal::from(21880));
        assert_eq!(totals.gross_amount(), Decimal::from(26880));
    }

    #[test]
    fn mixed_rates_sum_per_line() {
        let lines = vec![line(1, 1000, 25), line(4, 250, 6), line(1, 99, 0)];
        let totals = compute_invoice_totals(&lines, None);
        assert_eq!(totals.subtotal, Decimal::from(2099));
        assert_eq!(totals.total_tax, Decimal::from(310));
        assert_eq!(totals.total_amount, Decimal::from(2409));
    }

    #[test]
    fn no_lines_means_zero() {
        let totals = compute_invoice_totals(&Vec::<InvoiceLineItem>::new(), None);
        assert_eq!(totals, InvoiceTotals::default());
    }

    #[test]
    fn overflowing_sum_is_detected() {
        // Each line fits on its own; the two together do not.
        let lines = vec![
            InvoiceLineItem::from(LineItemInput::new(
                "A",
                1,
                Decimal::MAX - Decimal::from(10),
                TaxRate::percent(0),
            )),
            line(1, 100, 0),
        ];
        assert_eq!(checked_invoice_totals(&lines, None), None);
        assert_eq!(compute_invoice_totals(&lines, None).subtotal, Decimal::MAX);

        let small = vec![line(2, 12000, 12)];
        assert_eq!(
            checked_invoice_totals(&small, Some(Decimal::from(5000))),
            Some(compute_invoice_totals(&small, Some(Decimal::from(5000))))
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: totals satisfy `total = subtotal + tax − discount` and are
        /// independent of line order.
        #[test]
        fn totals_are_consistent_and_order_independent(
            rows in prop::collection::vec((1u32..50, 0i64..1_000_000, 0usize..4), 0..20),
            discount in 0i64..10_000
        ) {
            let lines: Vec<InvoiceLineItem> = rows
                .iter()
                .map(|(q, p, r)| line(*q, *p, TaxRate::STANDARD_PERCENTAGES[*r]))
                .collect();
            let discount = Some(Decimal::from(discount));

            let totals = compute_invoice_totals(&lines, discount);
            prop_assert_eq!(
                totals.total_amount,
                totals.subtotal + totals.total_tax - totals.discount_amount
            );

            let reversed: Vec<InvoiceLineItem> = lines.iter().rev().cloned().collect();
            prop_assert_eq!(compute_invoice_totals(&reversed, discount), totals);
            prop_assert_eq!(compute_invoice_totals(&lines, discount), totals);
        }
    }
}
