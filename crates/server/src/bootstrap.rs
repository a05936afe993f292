use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use reforma_core::catalog::CatalogError;
use reforma_core::config::{AppConfig, ConfigError, LoadOptions};
use reforma_render::DocumentRenderer;

use crate::portal;
use crate::sessions::SessionStore;
use crate::state::{AppState, CatalogHandle};

const QUOTE_TEMPLATE_DIR: &str = "templates/quotes";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("price catalog failed to load: {0}")]
    Catalog(#[from] CatalogError),
}

/// Loads configuration and assembles the shared application state.
///
/// The price catalog is required at startup: a missing or malformed table
/// aborts the boot instead of serving a portal that cannot quote.
pub fn bootstrap(options: LoadOptions) -> Result<AppState, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<AppState, BootstrapError> {
    let catalog = CatalogHandle::load(&config.catalog.path)?;

    let renderer = match DocumentRenderer::new(QUOTE_TEMPLATE_DIR) {
        Ok(renderer) => renderer,
        Err(e) => {
            warn!(
                error = %e,
                "failed to load quote templates from filesystem, using embedded fallback"
            );
            DocumentRenderer::with_embedded_templates()
        }
    };
    if !renderer.pdf_enabled() {
        warn!(
            event_name = "system.bootstrap.pdf_fallback",
            "wkhtmltopdf not found, quote documents will be served as printable HTML"
        );
    }

    let ttl = Duration::from_secs(config.server.session_ttl_minutes * 60);

    let state = AppState {
        config: Arc::new(config),
        catalog,
        sessions: SessionStore::new(ttl),
        renderer: Arc::new(renderer),
        templates: portal::init_templates(),
    };

    info!(
        event_name = "system.bootstrap.complete",
        company = %state.config.company.name,
        markup_rate = %state.config.pricing.markup_rate,
        tax_rate = %state.config.pricing.tax_rate,
        session_ttl_minutes = state.config.server.session_ttl_minutes,
        "application state ready"
    );

    Ok(state)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use reforma_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn price_table_fixture() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp price table");
        file.write_all(
            br#"
[[partida]]
categoria = "Pintura"
concepto = "Pared lisa (m2)"
precio_unitario = 5.00

[[partida]]
categoria = "Electricidad"
concepto = "Punto de luz"
precio_unitario = 45.00
"#,
        )
        .expect("write price table");
        file
    }

    #[test]
    fn bootstrap_fails_fast_on_a_missing_price_table() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                catalog_path: Some("/nonexistent/precios.toml".into()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let error = result.expect_err("boot should abort without a price table");
        assert!(matches!(error, BootstrapError::Catalog(_)));
    }

    #[test]
    fn bootstrap_assembles_state_from_a_valid_price_table() {
        let file = price_table_fixture();

        let state = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                catalog_path: Some(file.path().to_path_buf()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed with valid overrides");

        assert_eq!(state.catalog.current().len(), 2);
        assert!(state.sessions.is_empty());
        assert_eq!(state.config.company.name, "Reformas Integrales S.L.");
    }
}
