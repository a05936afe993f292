use serde::Serialize;

use reforma_core::catalog::{load_catalog_from_path, Catalog};
use reforma_core::config::{AppConfig, LoadOptions};
use reforma_core::pricing::format_eur;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct CatalogReport {
    path: String,
    categories: Vec<CategoryReport>,
}

#[derive(Debug, Serialize)]
struct CategoryReport {
    name: String,
    items: Vec<ItemReport>,
}

#[derive(Debug, Serialize)]
struct ItemReport {
    concept: String,
    unit_price: String,
}

pub fn run(json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("catalog", "config_validation", error.to_string(), 2)
        }
    };

    let catalog = match load_catalog_from_path(&config.catalog.path) {
        Ok(catalog) => catalog,
        Err(error) => {
            return CommandResult::failure("catalog", "catalog_load", error.to_string(), 4)
        }
    };

    let path = config.catalog.path.display().to_string();
    let output = if json_output {
        render_json(&path, &catalog)
    } else {
        render_table(&path, &catalog)
    };

    CommandResult { exit_code: 0, output }
}

fn render_json(path: &str, catalog: &Catalog) -> String {
    let report = CatalogReport {
        path: path.to_string(),
        categories: catalog
            .categories()
            .iter()
            .map(|category| CategoryReport {
                name: category.name.clone(),
                items: category
                    .items
                    .iter()
                    .map(|item| ItemReport {
                        concept: item.concept.clone(),
                        unit_price: format_eur(item.unit_price),
                    })
                    .collect(),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
        format!(
            "{{\"path\":\"{}\",\"error\":\"serialization failed: {}\"}}",
            path.replace('"', "\\\""),
            error.to_string().replace('"', "\\\"")
        )
    })
}

/// Plain listing grouped by category, with prices right-aligned on a column
/// wide enough for the longest concept.
fn render_table(path: &str, catalog: &Catalog) -> String {
    let mut lines = vec![format!(
        "price table `{}`: {} categories, {} line items",
        path,
        catalog.len(),
        catalog.item_count()
    )];

    let concept_width = catalog
        .categories()
        .iter()
        .flat_map(|category| category.items.iter())
        .map(|item| item.concept.chars().count())
        .max()
        .unwrap_or(0);

    for category in catalog.categories() {
        lines.push(String::new());
        lines.push(format!("{}:", category.name));
        for item in &category.items {
            let padding = concept_width.saturating_sub(item.concept.chars().count());
            lines.push(format!(
                "  {}{}  {:>12}",
                item.concept,
                " ".repeat(padding),
                format_eur(item.unit_price)
            ));
        }
    }

    lines.join("\n")
}
