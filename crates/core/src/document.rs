use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::budget::AccumulatedBudget;
use crate::client::ClientInfo;
use crate::errors::DomainError;
use crate::pricing::{format_eur, format_percent, QuoteTotals};

pub const DOCUMENT_TITLE: &str = "Presupuesto de Reforma";

/// Fixed terms printed at the foot of every quote.
pub const LEGAL_TERMS: [&str; 4] = [
    "Presupuesto válido durante 30 días desde la fecha de emisión.",
    "Los precios incluyen mano de obra y los materiales indicados en cada partida.",
    "Cualquier trabajo no recogido en este presupuesto se valorará y facturará por separado.",
    "Forma de pago: 40 % a la aceptación, 40 % durante la ejecución y 20 % a la finalización de la obra.",
];

pub const SIGNATURE_LABELS: [&str; 2] = ["Conforme: el cliente", "Por la empresa"];

/// Display-ready quote document.
///
/// Every monetary value in here is already rounded to two decimals and
/// formatted with its currency symbol. The renderer handles layout and
/// pagination only; it never does arithmetic or rounding of its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteDocument {
    pub title: String,
    pub company: String,
    pub reference: String,
    pub issued_on: String,
    pub client: ClientBlock,
    pub categories: Vec<CategoryBlock>,
    pub subtotal: String,
    pub markup_label: String,
    pub markup: String,
    pub tax_label: String,
    pub tax: String,
    pub total: String,
    pub legal_terms: Vec<String>,
    pub signature_labels: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientBlock {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryBlock {
    pub name: String,
    pub lines: Vec<LineBlock>,
    pub subtotal: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineBlock {
    pub concept: String,
    pub quantity: String,
    pub unit_price: String,
    pub amount: String,
}

impl QuoteDocument {
    /// Builds the display model for one quote. Fails with
    /// `MissingClientInfo` when any client field is blank; the budget and
    /// totals are taken as already computed.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        company: &str,
        reference: &str,
        client: &ClientInfo,
        budget: &AccumulatedBudget,
        totals: &QuoteTotals,
        markup_rate: Decimal,
        tax_rate: Decimal,
        issued_on: NaiveDate,
    ) -> Result<Self, DomainError> {
        client.validate()?;

        let categories = budget
            .entries()
            .iter()
            .map(|entry| CategoryBlock {
                name: entry.category.clone(),
                lines: entry
                    .detail
                    .lines()
                    .iter()
                    .map(|line| LineBlock {
                        concept: line.concept.clone(),
                        quantity: line.quantity.normalize().to_string(),
                        unit_price: format_eur(line.unit_price),
                        amount: format_eur(line.amount),
                    })
                    .collect(),
                subtotal: format_eur(entry.detail.subtotal()),
            })
            .collect();

        Ok(Self {
            title: DOCUMENT_TITLE.to_string(),
            company: company.to_string(),
            reference: reference.to_string(),
            issued_on: issued_on.format("%d/%m/%Y").to_string(),
            client: ClientBlock {
                name: client.name.clone(),
                email: client.email.clone(),
                phone: client.phone.clone(),
            },
            categories,
            subtotal: format_eur(totals.subtotal),
            markup_label: markup_label(markup_rate),
            markup: format_eur(totals.markup),
            tax_label: tax_label(tax_rate),
            tax: format_eur(totals.tax),
            total: format_eur(totals.total),
            legal_terms: LEGAL_TERMS.iter().map(|term| term.to_string()).collect(),
            signature_labels: SIGNATURE_LABELS.iter().map(|label| label.to_string()).collect(),
        })
    }
}

/// Label for the overhead line, e.g. `Gastos generales (5 %)`.
pub fn markup_label(markup_rate: Decimal) -> String {
    format!("Gastos generales ({} %)", format_percent(markup_rate))
}

/// Label for the tax line, e.g. `IVA (21 %)`.
pub fn tax_label(tax_rate: Decimal) -> String {
    format!("IVA ({} %)", format_percent(tax_rate))
}

/// Stable reference printed on the document, derived from the issue date
/// and the session id, e.g. `PRE-20260823-1f3a9c0d`.
pub fn quote_reference(session_id: Uuid, issued_on: NaiveDate) -> String {
    let id = session_id.simple().to_string();
    format!("PRE-{}-{}", issued_on.format("%Y%m%d"), &id[..8])
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{quote_reference, QuoteDocument};
    use crate::budget::AccumulatedBudget;
    use crate::catalog::{Catalog, PriceRow};
    use crate::client::ClientInfo;
    use crate::errors::DomainError;
    use crate::pricing::{compute_category_detail, compute_quote_totals, LineItemQuantity};

    fn issue_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).expect("valid date")
    }

    fn sample_budget() -> AccumulatedBudget {
        let catalog = Catalog::from_rows(vec![
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
        .expect("rows are well formed");

        let mut budget = AccumulatedBudget::new();
        budget
            .add_category(
                "Pintura",
                compute_category_detail(
                    &catalog,
                    "Pintura",
                    &[LineItemQuantity {
                        concept: "Pared (m²)".to_string(),
                        quantity: Decimal::from(20),
                    }],
                )
                .expect("detail"),
            )
            .expect("non-empty");
        budget
            .add_category(
                "Electricidad",
                compute_category_detail(
                    &catalog,
                    "Electricidad",
                    &[LineItemQuantity {
                        concept: "Enchufe".to_string(),
                        quantity: Decimal::ONE,
                    }],
                )
                .expect("detail"),
            )
            .expect("non-empty");
        budget
    }

    #[test]
    fn assembles_a_display_ready_document() {
        let budget = sample_budget();
        let totals = compute_quote_totals(&budget, Decimal::new(5, 2), Decimal::ZERO);
        let client = ClientInfo::new("Ana Ruiz", "ana@example.com", "600111222");

        let document = QuoteDocument::assemble(
            "Reformas Integrales S.L.",
            "PRE-20260823-1f3a9c0d",
            &client,
            &budget,
            &totals,
            Decimal::new(5, 2),
            Decimal::ZERO,
            issue_date(),
        )
        .expect("client is complete");

        assert_eq!(document.title, "Presupuesto de Reforma");
        assert_eq!(document.issued_on, "23/08/2026");
        assert_eq!(document.client.name, "Ana Ruiz");

        assert_eq!(document.categories.len(), 2);
        let pintura = &document.categories[0];
        assert_eq!(pintura.name, "Pintura");
        assert_eq!(pintura.lines[0].quantity, "20");
        assert_eq!(pintura.lines[0].unit_price, "5.00 €");
        assert_eq!(pintura.lines[0].amount, "100.00 €");
        assert_eq!(pintura.subtotal, "100.00 €");

        assert_eq!(document.subtotal, "145.00 €");
        assert_eq!(document.markup_label, "Gastos generales (5 %)");
        assert_eq!(document.markup, "7.25 €");
        assert_eq!(document.tax_label, "IVA (0 %)");
        assert_eq!(document.tax, "0.00 €");
        assert_eq!(document.total, "152.25 €");

        assert_eq!(document.legal_terms.len(), 4);
        assert_eq!(document.signature_labels.len(), 2);
    }

    #[test]
    fn rounding_happens_only_at_assembly() {
        let catalog = Catalog::from_rows(vec![PriceRow {
            category: "Pintura".to_string(),
            concept: "Pared (m²)".to_string(),
            unit_price: Decimal::new(111, 2),
        }])
        .expect("rows are well formed");

        let mut budget = AccumulatedBudget::new();
        budget
            .add_category(
                "Pintura",
                compute_category_detail(
                    &catalog,
                    "Pintura",
                    &[LineItemQuantity {
                        concept: "Pared (m²)".to_string(),
                        // 2.5 * 1.11 = 2.775, exact until display
                        quantity: Decimal::new(25, 1),
                    }],
                )
                .expect("detail"),
            )
            .expect("non-empty");

        let totals = compute_quote_totals(&budget, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(totals.subtotal, Decimal::new(2775, 3));

        let document = QuoteDocument::assemble(
            "Reformas Integrales S.L.",
            "PRE-1",
            &ClientInfo::new("Ana", "ana@example.com", "600111222"),
            &budget,
            &totals,
            Decimal::ZERO,
            Decimal::ZERO,
            issue_date(),
        )
        .expect("client is complete");

        assert_eq!(document.categories[0].lines[0].quantity, "2.5");
        assert_eq!(document.categories[0].lines[0].amount, "2.78 €");
        assert_eq!(document.subtotal, "2.78 €");
    }

    #[test]
    fn incomplete_client_blocks_assembly() {
        let budget = sample_budget();
        let totals = compute_quote_totals(&budget, Decimal::new(5, 2), Decimal::ZERO);

        let error = QuoteDocument::assemble(
            "Reformas Integrales S.L.",
            "PRE-2",
            &ClientInfo::new("Ana Ruiz", "", ""),
            &budget,
            &totals,
            Decimal::new(5, 2),
            Decimal::ZERO,
            issue_date(),
        )
        .expect_err("email and phone are blank");

        assert!(matches!(error, DomainError::MissingClientInfo { ref missing } if missing.len() == 2));
    }

    #[test]
    fn reference_combines_date_and_session_id() {
        let id = Uuid::parse_str("1f3a9c0d-0000-4000-8000-000000000000").expect("uuid");
        assert_eq!(quote_reference(id, issue_date()), "PRE-20260823-1f3a9c0d");
    }
}
