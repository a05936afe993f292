use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use reforma_core::budget::AccumulatedBudget;
use reforma_core::catalog::{load_catalog_from_path, Catalog};
use reforma_core::client::ClientInfo;
use reforma_core::config::{AppConfig, LoadOptions};
use reforma_core::document::{quote_reference, QuoteDocument};
use reforma_core::pricing::{
    compute_category_detail, compute_quote_totals, format_eur, LineItemQuantity,
};
use reforma_render::{is_known_template, DocumentRenderer, RenderedDocument, TEMPLATES};

use crate::commands::CommandResult;

/// Quote request as read from the `--request` TOML file. Field names accept
/// the same Spanish spellings as the price table.
#[derive(Debug, Deserialize)]
struct QuoteRequest {
    #[serde(default, alias = "cliente")]
    client: ClientFields,
    #[serde(default, rename = "category", alias = "categoria")]
    categories: Vec<CategoryRequest>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientFields {
    #[serde(default, alias = "nombre")]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default, alias = "telefono")]
    phone: String,
}

#[derive(Debug, Deserialize)]
struct CategoryRequest {
    #[serde(alias = "nombre")]
    name: String,
    #[serde(default, alias = "cantidades")]
    quantities: BTreeMap<String, Decimal>,
}

pub fn run(request_path: &Path, out: Option<&Path>, template: &str, html_only: bool) -> CommandResult {
    if !is_known_template(template) {
        return CommandResult::failure(
            "quote",
            "unknown_template",
            format!("unknown template `{template}`, expected one of: {}", TEMPLATES.join(", ")),
            3,
        );
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("quote", "config_validation", error.to_string(), 2)
        }
    };

    let request = match read_request(request_path) {
        Ok(request) => request,
        Err(message) => return CommandResult::failure("quote", "request", message, 3),
    };

    let catalog = match load_catalog_from_path(&config.catalog.path) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure("quote", "catalog_load", error.to_string(), 4),
    };

    let mut budget = AccumulatedBudget::new();
    for category in &request.categories {
        let quantities = ordered_quantities(&catalog, &category.name, &category.quantities);
        let committed = compute_category_detail(&catalog, &category.name, &quantities)
            .and_then(|detail| budget.add_category(category.name.as_str(), detail));
        if let Err(error) = committed {
            return CommandResult::failure("quote", "quote_compute", error.to_string(), 5);
        }
    }
    if budget.is_empty() {
        return CommandResult::failure(
            "quote",
            "quote_compute",
            "request contains no category with a positive quantity",
            5,
        );
    }

    let totals =
        compute_quote_totals(&budget, config.pricing.markup_rate, config.pricing.tax_rate);

    let issued_on = Utc::now().date_naive();
    let reference = quote_reference(Uuid::new_v4(), issued_on);
    let client =
        ClientInfo::new(&request.client.name, &request.client.email, &request.client.phone);

    let document = match QuoteDocument::assemble(
        &config.company.name,
        &reference,
        &client,
        &budget,
        &totals,
        config.pricing.markup_rate,
        config.pricing.tax_rate,
        issued_on,
    ) {
        Ok(document) => document,
        Err(error) => return CommandResult::failure("quote", "quote_compute", error.to_string(), 5),
    };

    let rendered = match render_document(&document, template, html_only) {
        Ok(rendered) => rendered,
        Err(message) => return CommandResult::failure("quote", "document_render", message, 6),
    };

    let extension = rendered.extension();
    let out_path = output_path(out, &reference, extension);
    if let Err(error) = fs::write(&out_path, rendered.into_bytes()) {
        return CommandResult::failure(
            "quote",
            "output_write",
            format!("could not write `{}`: {error}", out_path.display()),
            7,
        );
    }

    CommandResult::success_with(
        "quote",
        format!("quote {reference} written to `{}`", out_path.display()),
        json!({
            "reference": reference,
            "output": out_path.display().to_string(),
            "format": extension,
            "subtotal": format_eur(totals.subtotal),
            "markup": format_eur(totals.markup),
            "tax": format_eur(totals.tax),
            "total": format_eur(totals.total),
        }),
    )
}

fn read_request(path: &Path) -> Result<QuoteRequest, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read request file `{}`: {error}", path.display()))?;
    toml::from_str(&raw)
        .map_err(|error| format!("could not parse request file `{}`: {error}", path.display()))
}

/// Orders the requested quantities the way the catalog lists the category's
/// concepts, so document lines match the price table. Concepts the catalog
/// does not know are kept at the end and surface as lookup errors instead of
/// being silently dropped.
fn ordered_quantities(
    catalog: &Catalog,
    category: &str,
    requested: &BTreeMap<String, Decimal>,
) -> Vec<LineItemQuantity> {
    let mut remaining = requested.clone();
    let mut ordered = Vec::with_capacity(requested.len());

    if let Some(entry) = catalog.category(category) {
        for item in &entry.items {
            if let Some(quantity) = remaining.remove(&item.concept) {
                ordered.push(LineItemQuantity { concept: item.concept.clone(), quantity });
            }
        }
    }
    for (concept, quantity) in remaining {
        ordered.push(LineItemQuantity { concept, quantity });
    }

    ordered
}

fn render_document(
    document: &QuoteDocument,
    template: &str,
    html_only: bool,
) -> Result<RenderedDocument, String> {
    let renderer = match DocumentRenderer::new("templates/quotes") {
        Ok(renderer) => renderer,
        Err(_) => DocumentRenderer::with_embedded_templates(),
    };

    if html_only {
        return renderer
            .render_html(document, template)
            .map(RenderedDocument::Html)
            .map_err(|error| error.to_string());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))?;

    runtime.block_on(renderer.render(document, template)).map_err(|error| error.to_string())
}

fn output_path(out: Option<&Path>, reference: &str, extension: &str) -> PathBuf {
    match out {
        Some(path) => path.with_extension(extension),
        None => PathBuf::from(format!("{reference}.{extension}")),
    }
}
