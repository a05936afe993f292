use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::{AccumulatedBudget, CategoryDetail};
use crate::client::ClientInfo;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    Accumulating,
    Finalized,
}

/// One user's quoting session: their client details, the budget they have
/// accumulated so far, and where they are in the quoting lifecycle.
///
/// Every operation goes through an explicit session instance, so concurrent
/// users never observe each other's budgets. `Finalized` is not a dead end:
/// committing, removing or resetting after a document was produced moves the
/// session back into an editable state, and re-finalizing is allowed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub client: ClientInfo,
    pub budget: AccumulatedBudget,
    pub state: SessionState,
}

impl QuoteSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            client: ClientInfo::default(),
            budget: AccumulatedBudget::new(),
            state: SessionState::Empty,
        }
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self.state, next),
            (SessionState::Empty, SessionState::Accumulating)
                | (SessionState::Accumulating, SessionState::Accumulating)
                | (SessionState::Accumulating, SessionState::Finalized)
                | (SessionState::Finalized, SessionState::Accumulating)
                | (SessionState::Finalized, SessionState::Finalized)
                | (_, SessionState::Empty)
        )
    }

    /// Commits one category's computed detail to the budget. Replaces the
    /// detail when the category was already committed.
    pub fn commit_category(
        &mut self,
        category: impl Into<String>,
        detail: CategoryDetail,
    ) -> Result<(), DomainError> {
        self.budget.add_category(category, detail)?;
        self.state = SessionState::Accumulating;
        Ok(())
    }

    /// Removes a committed category. Dropping the last one returns the
    /// session to `Empty`; removing from a finalized session reopens it.
    pub fn remove_category(&mut self, category: &str) -> Option<CategoryDetail> {
        let removed = self.budget.remove_category(category)?;
        self.state = if self.budget.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Accumulating
        };
        Some(removed)
    }

    pub fn set_client(&mut self, client: ClientInfo) {
        self.client = client;
    }

    /// Records that a quote document was produced for the current budget.
    /// Fails from `Empty`: there is nothing to quote yet.
    pub fn mark_finalized(&mut self) -> Result<(), DomainError> {
        if !self.can_transition_to(SessionState::Finalized) {
            return Err(DomainError::InvalidSessionTransition {
                state: self.state,
                action: "finalize".to_string(),
            });
        }
        self.state = SessionState::Finalized;
        Ok(())
    }

    /// Starts a fresh quote: clears the budget, keeps the client details
    /// (matching the form, where client fields survive a budget restart).
    pub fn reset(&mut self) {
        self.budget.reset();
        self.state = SessionState::Empty;
    }
}

impl Default for QuoteSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{QuoteSession, SessionState};
    use crate::budget::CategoryDetail;
    use crate::catalog::{Catalog, PriceRow};
    use crate::client::ClientInfo;
    use crate::errors::DomainError;
    use crate::pricing::{compute_category_detail, LineItemQuantity};

    fn catalog() -> Catalog {
        Catalog::from_rows(vec![
            PriceRow {
                category: "Pintura".to_string(),
                concept: "Pared (m²)".to_string(),
                unit_price: Decimal::new(500, 2),
            },
            PriceRow {
                category: "Electricidad".to_string(),
                concept: "Enchufe".to_string(),
                unit_price: Decimal::new(4500, 2),
            },
        ])
        .expect("rows are well formed")
    }

    fn detail(catalog: &Catalog, category: &str, concept: &str, quantity: i64) -> CategoryDetail {
        compute_category_detail(
            catalog,
            category,
            &[LineItemQuantity { concept: concept.to_string(), quantity: Decimal::from(quantity) }],
        )
        .expect("known item")
    }

    #[test]
    fn session_walks_empty_accumulating_finalized() {
        let catalog = catalog();
        let mut session = QuoteSession::new();
        assert_eq!(session.state, SessionState::Empty);

        session
            .commit_category("Pintura", detail(&catalog, "Pintura", "Pared (m²)", 20))
            .expect("commit");
        assert_eq!(session.state, SessionState::Accumulating);

        session.mark_finalized().expect("budget is non-empty");
        assert_eq!(session.state, SessionState::Finalized);
    }

    #[test]
    fn finalizing_an_empty_session_fails() {
        let mut session = QuoteSession::new();
        let error = session.mark_finalized().expect_err("nothing to quote");
        assert!(matches!(
            error,
            DomainError::InvalidSessionTransition { state: SessionState::Empty, .. }
        ));
        assert_eq!(session.state, SessionState::Empty);
    }

    #[test]
    fn finalized_sessions_reopen_on_commit_and_allow_refinalizing() {
        let catalog = catalog();
        let mut session = QuoteSession::new();
        session
            .commit_category("Pintura", detail(&catalog, "Pintura", "Pared (m²)", 20))
            .expect("commit");
        session.mark_finalized().expect("finalize");

        session
            .commit_category("Electricidad", detail(&catalog, "Electricidad", "Enchufe", 2))
            .expect("commit after finalize");
        assert_eq!(session.state, SessionState::Accumulating);

        session.mark_finalized().expect("re-finalize");
        assert_eq!(session.state, SessionState::Finalized);
    }

    #[test]
    fn removing_the_last_category_returns_to_empty() {
        let catalog = catalog();
        let mut session = QuoteSession::new();
        session
            .commit_category("Pintura", detail(&catalog, "Pintura", "Pared (m²)", 20))
            .expect("commit");
        session.mark_finalized().expect("finalize");

        session.remove_category("Pintura").expect("category present");
        assert_eq!(session.state, SessionState::Empty);
        assert!(session.mark_finalized().is_err());
    }

    #[test]
    fn removing_one_of_several_reopens_accumulation() {
        let catalog = catalog();
        let mut session = QuoteSession::new();
        session
            .commit_category("Pintura", detail(&catalog, "Pintura", "Pared (m²)", 20))
            .expect("commit");
        session
            .commit_category("Electricidad", detail(&catalog, "Electricidad", "Enchufe", 2))
            .expect("commit");
        session.mark_finalized().expect("finalize");

        session.remove_category("Pintura").expect("category present");
        assert_eq!(session.state, SessionState::Accumulating);
    }

    #[test]
    fn reset_clears_the_budget_but_keeps_the_client() {
        let catalog = catalog();
        let mut session = QuoteSession::new();
        session.set_client(ClientInfo::new("Ana Ruiz", "ana@example.com", "600111222"));
        session
            .commit_category("Pintura", detail(&catalog, "Pintura", "Pared (m²)", 20))
            .expect("commit");

        session.reset();
        assert_eq!(session.state, SessionState::Empty);
        assert!(session.budget.is_empty());
        assert_eq!(session.client.name, "Ana Ruiz");
    }

    #[test]
    fn rejected_empty_contribution_does_not_change_state() {
        let catalog = catalog();
        let mut session = QuoteSession::new();
        let empty = compute_category_detail(
            &catalog,
            "Pintura",
            &[LineItemQuantity { concept: "Pared (m²)".to_string(), quantity: Decimal::ZERO }],
        )
        .expect("zero quantities are not an error");

        let error = session.commit_category("Pintura", empty).expect_err("empty detail");
        assert!(matches!(error, DomainError::EmptyContribution { .. }));
        assert_eq!(session.state, SessionState::Empty);
    }
}
