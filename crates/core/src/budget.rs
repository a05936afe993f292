use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// One priced line inside a category: `amount` is always
/// `quantity * unit_price`, computed exactly, never rounded here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailLine {
    pub concept: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// The computed detail for one committed category, restricted to line items
/// with a positive quantity. Built by quote computation and treated as
/// immutable once stored in a budget.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDetail {
    lines: Vec<DetailLine>,
}

impl CategoryDetail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line, or replaces the existing line for the same concept
    /// in place. Crate-private so every stored amount comes out of the
    /// pricing computation.
    pub(crate) fn upsert_line(&mut self, line: DetailLine) {
        match self.lines.iter().position(|existing| existing.concept == line.concept) {
            Some(index) => self.lines[index] = line,
            None => self.lines.push(line),
        }
    }

    pub fn lines(&self) -> &[DetailLine] {
        &self.lines
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(|line| line.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub category: String,
    pub detail: CategoryDetail,
}

/// All categories committed so far in one quoting session, in the order the
/// user added them. Owned by the session layer; quote computation only reads
/// it to derive totals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatedBudget {
    entries: Vec<BudgetEntry>,
}

impl AccumulatedBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the category, or replaces its detail wholesale when the
    /// category was already committed (the earlier detail is discarded,
    /// never merged, and the entry keeps its position).
    ///
    /// An empty detail is rejected: committing a category requires at least
    /// one positive quantity.
    pub fn add_category(
        &mut self,
        category: impl Into<String>,
        detail: CategoryDetail,
    ) -> Result<(), DomainError> {
        let category = category.into();
        if detail.is_empty() {
            return Err(DomainError::EmptyContribution { category });
        }

        match self.entries.iter().position(|entry| entry.category == category) {
            Some(index) => self.entries[index].detail = detail,
            None => self.entries.push(BudgetEntry { category, detail }),
        }

        Ok(())
    }

    /// Deletes the entry if present; a no-op for absent categories.
    pub fn remove_category(&mut self, category: &str) -> Option<CategoryDetail> {
        let index = self.entries.iter().position(|entry| entry.category == category)?;
        Some(self.entries.remove(index).detail)
    }

    /// Exact sum of all category subtotals; zero for an empty budget.
    pub fn grand_total(&self) -> Decimal {
        self.entries.iter().map(|entry| entry.detail.subtotal()).sum()
    }

    /// Clears every entry, starting a fresh quote.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, category: &str) -> Option<&CategoryDetail> {
        self.entries.iter().find(|entry| entry.category == category).map(|entry| &entry.detail)
    }

    pub fn entries(&self) -> &[BudgetEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
