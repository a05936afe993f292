use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::budget::{AccumulatedBudget, CategoryDetail, DetailLine};
use crate::catalog::Catalog;
use crate::errors::DomainError;

/// User-entered quantity for one line item of the selected category.
/// Fractional values are legal (square-metre and linear-metre work).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemQuantity {
    pub concept: String,
    pub quantity: Decimal,
}

/// Derived totals for the whole accumulated budget. Never stored, always
/// recomputed from the budget, and kept unrounded until presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub markup: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Prices one category: each entry with quantity > 0 is looked up in the
/// catalog and priced at exactly `quantity * unit_price`.
///
/// Quantities of zero or less are skipped without error (no work requested
/// for that item), so an all-zero entry yields an empty detail and it is the
/// caller's decision to reject it when committing. A concept repeated in the
/// input keeps the last entry, like re-typing a quantity in the form.
pub fn compute_category_detail(
    catalog: &Catalog,
    category: &str,
    quantities: &[LineItemQuantity],
) -> Result<CategoryDetail, DomainError> {
    let mut detail = CategoryDetail::new();

    for entry in quantities {
        if entry.quantity <= Decimal::ZERO {
            continue;
        }

        let unit_price = catalog.unit_price(category, &entry.concept)?;
        detail.upsert_line(DetailLine {
            concept: entry.concept.clone(),
            quantity: entry.quantity,
            unit_price,
            amount: entry.quantity * unit_price,
        });
    }

    Ok(detail)
}

/// Derives the quote totals from the budget:
/// markup on the subtotal, tax on the post-markup base, all exact.
pub fn compute_quote_totals(
    budget: &AccumulatedBudget,
    markup_rate: Decimal,
    tax_rate: Decimal,
) -> QuoteTotals {
    let subtotal = budget.grand_total();
    let markup = subtotal * markup_rate;
    let tax = (subtotal + markup) * tax_rate;

    QuoteTotals { subtotal, markup, tax, total: subtotal + markup + tax }
}

/// Rounds for display: two decimals, midpoints away from zero. Applied only
/// at the presentation boundary so accumulation never compounds rounding.
pub fn round_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn format_eur(amount: Decimal) -> String {
    format!("{:.2} €", round_display(amount))
}

/// Renders a rate as a percentage label value, e.g. `0.05` -> `5`.
pub fn format_percent(rate: Decimal) -> String {
    (rate * Decimal::ONE_HUNDRED).normalize().to_string()
}
