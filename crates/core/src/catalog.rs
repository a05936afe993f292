use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::DomainError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read price table `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse price table `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("price table row {row}: missing `{field}`")]
    MissingField { row: usize, field: &'static str },
    #[error("price table row {row}: `{concept}` has negative unit price {price}")]
    NegativePrice { row: usize, concept: String, price: Decimal },
}

/// One validated record of the tabular price source:
/// a category, a line item ("concepto") and its unit price.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceRow {
    pub category: String,
    pub concept: String,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub concept: String,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub name: String,
    pub items: Vec<CatalogItem>,
}

/// The full price table, category -> line item -> unit price.
///
/// Built once from a `PriceTableSource` and never mutated afterwards, so a
/// shared reference can be read from any number of sessions without locking.
/// Source row order is preserved for presentation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    categories: Vec<CategoryEntry>,
}

impl Catalog {
    /// Groups rows into the category -> item -> price table.
    ///
    /// Categories appear in first-row order; within a category a repeated
    /// concept keeps its slot and takes the price of the last row, matching
    /// how the source table behaves when a row is corrected by appending.
    pub fn from_rows(rows: Vec<PriceRow>) -> Result<Self, CatalogError> {
        let mut categories: Vec<CategoryEntry> = Vec::new();

        for (index, row) in rows.into_iter().enumerate() {
            if row.unit_price < Decimal::ZERO {
                return Err(CatalogError::NegativePrice {
                    row: index + 1,
                    concept: row.concept,
                    price: row.unit_price,
                });
            }

            match categories.iter().position(|entry| entry.name == row.category) {
                Some(category_index) => {
                    let items = &mut categories[category_index].items;
                    match items.iter().position(|item| item.concept == row.concept) {
                        Some(item_index) => items[item_index].unit_price = row.unit_price,
                        None => items
                            .push(CatalogItem { concept: row.concept, unit_price: row.unit_price }),
                    }
                }
                None => categories.push(CategoryEntry {
                    name: row.category,
                    items: vec![CatalogItem { concept: row.concept, unit_price: row.unit_price }],
                }),
            }
        }

        Ok(Self { categories })
    }

    pub fn unit_price(&self, category: &str, concept: &str) -> Result<Decimal, DomainError> {
        let entry = self
            .category(category)
            .ok_or_else(|| DomainError::UnknownCategory { category: category.to_string() })?;

        entry
            .items
            .iter()
            .find(|item| item.concept == concept)
            .map(|item| item.unit_price)
            .ok_or_else(|| DomainError::UnknownLineItem {
                category: category.to_string(),
                concept: concept.to_string(),
            })
    }

    pub fn category(&self, name: &str) -> Option<&CategoryEntry> {
        self.categories.iter().find(|entry| entry.name == name)
    }

    pub fn categories(&self) -> &[CategoryEntry] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|entry| entry.items.len()).sum()
    }
}

/// A tabular price provider, queried once at startup (and again on an
/// explicit reload). Implementations validate field presence; grouping and
/// the negative-price check happen in `Catalog::from_rows`.
pub trait PriceTableSource {
    fn rows(&self) -> Result<Vec<PriceRow>, CatalogError>;
}

/// Price table stored as TOML `[[partida]]` records.
///
/// Field names mirror the spreadsheet this replaces, so `categoria`,
/// `concepto` and `precio_unitario` are the primary spellings; the
/// capitalized header variants and English names are accepted as aliases.
#[derive(Clone, Debug)]
pub struct TomlPriceTable {
    path: PathBuf,
}

impl TomlPriceTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PriceTableSource for TomlPriceTable {
    fn rows(&self) -> Result<Vec<PriceRow>, CatalogError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|source| CatalogError::ReadFile { path: self.path.clone(), source })?;

        let table: RawTable = toml::from_str(&raw)
            .map_err(|source| CatalogError::ParseFile { path: self.path.clone(), source })?;

        table
            .rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| validate_row(index + 1, row))
            .collect()
    }
}

pub fn load_catalog(source: &dyn PriceTableSource) -> Result<Catalog, CatalogError> {
    Catalog::from_rows(source.rows()?)
}

pub fn load_catalog_from_path(path: impl Into<PathBuf>) -> Result<Catalog, CatalogError> {
    load_catalog(&TomlPriceTable::new(path))
}

#[derive(Debug, Default, Deserialize)]
struct RawTable {
    #[serde(default, rename = "partida", alias = "row")]
    rows: Vec<RawRow>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRow {
    #[serde(
        default,
        rename = "categoria",
        alias = "Categoria",
        alias = "Categoría",
        alias = "category"
    )]
    category: Option<String>,
    #[serde(default, rename = "concepto", alias = "Concepto", alias = "concept")]
    concept: Option<String>,
    #[serde(
        default,
        rename = "precio_unitario",
        alias = "Precio_unitario",
        alias = "unit_price"
    )]
    unit_price: Option<Decimal>,
}

fn validate_row(row: usize, raw: RawRow) -> Result<PriceRow, CatalogError> {
    let category = raw
        .category
        .filter(|value| !value.trim().is_empty())
        .ok_or(CatalogError::MissingField { row, field: "categoria" })?;
    let concept = raw
        .concept
        .filter(|value| !value.trim().is_empty())
        .ok_or(CatalogError::MissingField { row, field: "concepto" })?;
    let unit_price =
        raw.unit_price.ok_or(CatalogError::MissingField { row, field: "precio_unitario" })?;

    Ok(PriceRow { category, concept, unit_price })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{load_catalog_from_path, Catalog, CatalogError, PriceRow};
    use crate::errors::DomainError;

    fn row(category: &str, concept: &str, cents: i64) -> PriceRow {
        PriceRow {
            category: category.to_string(),
            concept: concept.to_string(),
            unit_price: Decimal::new(cents, 2),
        }
    }

    fn sample_catalog() -> Catalog {
        Catalog::from_rows(vec![
            row("Pintura", "Pared (m²)", 500),
            row("Pintura", "Techo (m²)", 750),
            row("Electricidad", "Enchufe", 4500),
        ])
        .expect("sample rows are well formed")
    }

    #[test]
    fn groups_rows_by_category_preserving_source_order() {
        let catalog = sample_catalog();

        let names: Vec<&str> =
            catalog.categories().iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["Pintura", "Electricidad"]);

        let pintura = catalog.category("Pintura").expect("category exists");
        assert_eq!(pintura.items.len(), 2);
        assert_eq!(pintura.items[0].concept, "Pared (m²)");
        assert_eq!(catalog.item_count(), 3);
    }

    #[test]
    fn repeated_concept_takes_the_last_price_and_keeps_its_slot() {
        let catalog = Catalog::from_rows(vec![
            row("Pintura", "Pared (m²)", 500),
            row("Pintura", "Techo (m²)", 750),
            row("Pintura", "Pared (m²)", 600),
        ])
        .expect("rows are well formed");

        let pintura = catalog.category("Pintura").expect("category exists");
        assert_eq!(pintura.items.len(), 2);
        assert_eq!(pintura.items[0].concept, "Pared (m²)");
        assert_eq!(pintura.items[0].unit_price, Decimal::new(600, 2));
    }

    #[test]
    fn negative_unit_price_is_rejected_with_row_context() {
        let error = Catalog::from_rows(vec![
            row("Pintura", "Pared (m²)", 500),
            row("Pintura", "Techo (m²)", -750),
        ])
        .expect_err("negative price must fail");

        match error {
            CatalogError::NegativePrice { row, ref concept, .. } => {
                assert_eq!(row, 2);
                assert_eq!(concept, "Techo (m²)");
            }
            other => panic!("expected NegativePrice, got {other:?}"),
        }
    }

    #[test]
    fn lookup_distinguishes_unknown_category_from_unknown_item() {
        let catalog = sample_catalog();

        assert_eq!(catalog.unit_price("Pintura", "Pared (m²)"), Ok(Decimal::new(500, 2)));
        assert!(matches!(
            catalog.unit_price("Domótica", "Sensor"),
            Err(DomainError::UnknownCategory { .. })
        ));
        assert!(matches!(
            catalog.unit_price("Pintura", "Mural"),
            Err(DomainError::UnknownLineItem { ref category, ref concept })
                if category == "Pintura" && concept == "Mural"
        ));
    }

    #[test]
    fn empty_row_set_builds_an_empty_catalog() {
        let catalog = Catalog::from_rows(Vec::new()).expect("no rows is not malformed");
        assert!(catalog.is_empty());
        assert_eq!(catalog.item_count(), 0);
    }

    #[test]
    fn toml_source_accepts_spreadsheet_header_spellings() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("precios.toml");
        fs::write(
            &path,
            r#"
[[partida]]
categoria = "Pintura"
concepto = "Pared (m²)"
precio_unitario = 5.0

[[partida]]
"Categoría" = "Pintura"
Concepto = "Techo (m²)"
Precio_unitario = 7.5
"#,
        )
        .expect("write price table");

        let catalog = load_catalog_from_path(&path).expect("catalog loads");
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.unit_price("Pintura", "Techo (m²)").expect("item exists"),
            Decimal::new(750, 2)
        );
    }

    #[test]
    fn missing_concept_fails_with_row_number() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("precios.toml");
        fs::write(
            &path,
            r#"
[[partida]]
categoria = "Pintura"
concepto = "Pared (m²)"
precio_unitario = 5.0

[[partida]]
categoria = "Pintura"
precio_unitario = 7.5
"#,
        )
        .expect("write price table");

        let error = load_catalog_from_path(&path).expect_err("missing concepto must fail");
        assert!(matches!(error, CatalogError::MissingField { row: 2, field: "concepto" }));
    }

    #[test]
    fn unreadable_price_table_reports_the_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("no-such-file.toml");

        let error = load_catalog_from_path(&path).expect_err("missing file must fail");
        assert!(matches!(error, CatalogError::ReadFile { .. }));
        assert!(error.to_string().contains("no-such-file.toml"));
    }
}
