use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use reforma_core::budget::AccumulatedBudget;
use reforma_core::catalog::load_catalog_from_path;
use reforma_core::client::ClientInfo;
use reforma_core::config::{AppConfig, LoadOptions};
use reforma_core::document::{quote_reference, QuoteDocument};
use reforma_core::pricing::{
    compute_category_detail, compute_quote_totals, format_eur, LineItemQuantity,
};
use reforma_render::{DocumentRenderer, DEFAULT_TEMPLATE};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

/// Exercises the quoting pipeline end to end without touching the portal:
/// config, catalog, pricing one category, totals, and an in-memory HTML
/// render of the resulting document.
pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("catalog_load"));
            checks.push(skipped("quote_computation"));
            checks.push(skipped("document_render"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let catalog = match timed_check(|| load_catalog_from_path(&config.catalog.path)) {
        Ok((elapsed_ms, catalog)) if catalog.is_empty() => {
            checks.push(SmokeCheck {
                name: "catalog_load",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: format!(
                    "price table `{}` loaded but has no categories to quote",
                    config.catalog.path.display()
                ),
            });
            checks.push(skipped("quote_computation"));
            checks.push(skipped("document_render"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
        Ok((elapsed_ms, catalog)) => {
            checks.push(SmokeCheck {
                name: "catalog_load",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: format!(
                    "{} categories, {} line items from `{}`",
                    catalog.len(),
                    catalog.item_count(),
                    config.catalog.path.display()
                ),
            });
            catalog
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "catalog_load",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("quote_computation"));
            checks.push(skipped("document_render"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    // price one unit of each line item in the first category
    let compute_started = Instant::now();
    let category = &catalog.categories()[0];
    let quantities: Vec<LineItemQuantity> = category
        .items
        .iter()
        .map(|item| LineItemQuantity { concept: item.concept.clone(), quantity: Decimal::ONE })
        .collect();

    let mut budget = AccumulatedBudget::new();
    let compute_result = compute_category_detail(&catalog, &category.name, &quantities)
        .and_then(|detail| budget.add_category(&category.name, detail));

    let totals = match compute_result {
        Ok(()) => {
            let totals = compute_quote_totals(
                &budget,
                config.pricing.markup_rate,
                config.pricing.tax_rate,
            );
            checks.push(SmokeCheck {
                name: "quote_computation",
                status: SmokeStatus::Pass,
                elapsed_ms: compute_started.elapsed().as_millis() as u64,
                message: format!(
                    "priced `{}` at {}, estimated total {}",
                    category.name,
                    format_eur(totals.subtotal),
                    format_eur(totals.total)
                ),
            });
            totals
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "quote_computation",
                status: SmokeStatus::Fail,
                elapsed_ms: compute_started.elapsed().as_millis() as u64,
                message: error.to_string(),
            });
            checks.push(skipped("document_render"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let render_started = Instant::now();
    let issued_on = Utc::now().date_naive();
    let reference = quote_reference(Uuid::new_v4(), issued_on);
    let client = ClientInfo::new("Cliente de prueba", "prueba@example.com", "600000000");

    let render_result = QuoteDocument::assemble(
        &config.company.name,
        &reference,
        &client,
        &budget,
        &totals,
        config.pricing.markup_rate,
        config.pricing.tax_rate,
        issued_on,
    )
    .map_err(|error| error.to_string())
    .and_then(|document| {
        DocumentRenderer::with_embedded_templates()
            .render_html(&document, DEFAULT_TEMPLATE)
            .map_err(|error| error.to_string())
    });

    match render_result {
        Ok(html) => checks.push(SmokeCheck {
            name: "document_render",
            status: SmokeStatus::Pass,
            elapsed_ms: render_started.elapsed().as_millis() as u64,
            message: format!("rendered {} bytes of printable HTML", html.len()),
        }),
        Err(error) => checks.push(SmokeCheck {
            name: "document_render",
            status: SmokeStatus::Fail,
            elapsed_ms: render_started.elapsed().as_millis() as u64,
            message: error,
        }),
    }

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
