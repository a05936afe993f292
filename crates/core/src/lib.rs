pub mod budget;
pub mod catalog;
pub mod client;
pub mod config;
pub mod document;
pub mod errors;
pub mod pricing;
pub mod session;

pub use budget::{AccumulatedBudget, BudgetEntry, CategoryDetail, DetailLine};
pub use catalog::{
    load_catalog, load_catalog_from_path, Catalog, CatalogError, CatalogItem, CategoryEntry,
    PriceRow, PriceTableSource, TomlPriceTable,
};
pub use client::ClientInfo;
pub use config::{
    AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig,
};
pub use document::{markup_label, quote_reference, tax_label, QuoteDocument, DOCUMENT_TITLE};
pub use errors::DomainError;
pub use pricing::{
    compute_category_detail, compute_quote_totals, format_eur, format_percent, round_display,
    LineItemQuantity, QuoteTotals,
};
pub use session::{QuoteSession, SessionState};
