use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub catalog: HealthCheck,
    pub renderer: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Readiness probe. The portal can quote only when the price catalog has at
/// least one category; the renderer is reported for operator visibility but
/// never degrades readiness, because HTML fallback still produces documents.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = catalog_check(&state);
    let ready = catalog.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        catalog,
        renderer: renderer_check(&state),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn catalog_check(state: &AppState) -> HealthCheck {
    let catalog = state.catalog.current();

    if catalog.is_empty() {
        HealthCheck {
            status: "degraded",
            detail: format!(
                "price table `{}` has no categories to quote",
                state.catalog.path().display()
            ),
        }
    } else {
        HealthCheck {
            status: "ready",
            detail: format!(
                "{} categories, {} line items priced",
                catalog.len(),
                catalog.item_count()
            ),
        }
    }
}

fn renderer_check(state: &AppState) -> HealthCheck {
    if state.renderer.pdf_enabled() {
        HealthCheck {
            status: "ready",
            detail: "wkhtmltopdf available, documents download as PDF".to_string(),
        }
    } else {
        HealthCheck {
            status: "ready",
            detail: "wkhtmltopdf not found, documents fall back to printable HTML".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::Json;
    use tempfile::NamedTempFile;
    use tera::Tera;

    use reforma_core::config::AppConfig;
    use reforma_render::DocumentRenderer;

    use crate::health::health;
    use crate::sessions::SessionStore;
    use crate::state::{AppState, CatalogHandle};

    fn state_with_price_table(body: &str) -> (AppState, NamedTempFile) {
        let mut file = NamedTempFile::new().expect("temp price table");
        file.write_all(body.as_bytes()).expect("write price table");

        let state = AppState {
            config: Arc::new(AppConfig::default()),
            catalog: CatalogHandle::load(file.path()).expect("catalog should load"),
            sessions: SessionStore::new(Duration::from_secs(60)),
            renderer: Arc::new(DocumentRenderer::with_embedded_templates()),
            templates: Arc::new(Tera::default()),
        };

        (state, file)
    }

    #[tokio::test]
    async fn health_is_ready_with_a_populated_catalog() {
        let (state, _file) = state_with_price_table(
            r#"
[[partida]]
categoria = "Pintura"
concepto = "Pared lisa"
precio_unitario = 5.00
"#,
        );

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.catalog.status, "ready");
        assert!(payload.catalog.detail.contains("1 categories"));
        assert_eq!(payload.renderer.status, "ready");
    }

    #[tokio::test]
    async fn health_degrades_on_an_empty_price_table() {
        let (state, _file) = state_with_price_table("# tabla sin partidas\n");

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.catalog.status, "degraded");
        assert!(payload.catalog.detail.contains("no categories"));
    }
}
