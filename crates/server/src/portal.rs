//! Quoting portal: HTML pages plus the JSON API that drives them.
//!
//! Routes:
//! - `GET  /`                                         — landing page
//! - `GET  /session/{id}`                             — quoting workspace for one session
//! - `POST /api/v1/sessions`                          — create a session
//! - `GET  /api/v1/sessions/{id}`                     — session snapshot with running totals
//! - `PUT  /api/v1/sessions/{id}/client`              — set client details
//! - `POST /api/v1/sessions/{id}/categories`          — price and commit one category
//! - `DELETE /api/v1/sessions/{id}/categories/{name}` — remove a committed category
//! - `POST /api/v1/sessions/{id}/reset`               — clear the budget, keep the client
//! - `POST /api/v1/sessions/{id}/document`            — render the quote document
//! - `GET  /api/v1/catalog`                           — price catalog for the category picker
//! - `POST /api/v1/catalog/reload`                    — re-read the price table

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tera::{Context, Tera};
use tracing::{error, info, warn};
use uuid::Uuid;

use reforma_core::client::ClientInfo;
use reforma_core::config::AppConfig;
use reforma_core::document::{markup_label, quote_reference, tax_label, QuoteDocument};
use reforma_core::errors::DomainError;
use reforma_core::pricing::{
    compute_category_detail, compute_quote_totals, format_eur, LineItemQuantity,
};
use reforma_core::session::{QuoteSession, SessionState};
use reforma_render::{is_known_template, DEFAULT_TEMPLATE};

use crate::state::AppState;

/// Error payload returned by every API route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub error: String,
}

/// Session snapshot served to the quoting page. All monetary values are
/// display-formatted here; the page never does arithmetic of its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state: SessionState,
    pub client: ClientInfo,
    pub categories: Vec<CategoryView>,
    pub totals: TotalsView,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub lines: Vec<LineView>,
    pub subtotal: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineView {
    pub concept: String,
    pub quantity: String,
    pub unit_price: String,
    pub amount: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TotalsView {
    pub subtotal: String,
    pub markup_label: String,
    pub markup: String,
    pub tax_label: String,
    pub tax: String,
    pub total: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogView {
    pub categories: Vec<CatalogCategoryView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogCategoryView {
    pub name: String,
    pub items: Vec<CatalogItemView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogItemView {
    pub concept: String,
    pub unit_price: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReloadView {
    pub categories: usize,
    pub items: usize,
}

/// One category contribution as posted by the quoting page.
#[derive(Clone, Debug, Deserialize)]
pub struct CategoryPayload {
    pub category: String,
    pub quantities: Vec<LineItemQuantity>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DocumentQuery {
    pub template: Option<String>,
}

/// Initialize the Tera engine for the portal pages, preferring filesystem
/// templates and falling back to the copies compiled into the binary.
pub fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/portal/**/*") {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "failed to load portal templates from filesystem, using empty Tera instance");
            Tera::default()
        }
    };

    let loaded: Vec<String> = tera.get_template_names().map(String::from).collect();
    if !loaded.iter().any(|name| name == "index.html") {
        tera.add_raw_template("index.html", include_str!("../../../templates/portal/index.html"))
            .ok();
    }
    if !loaded.iter().any(|name| name == "session.html") {
        tera.add_raw_template(
            "session.html",
            include_str!("../../../templates/portal/session.html"),
        )
        .ok();
    }

    Arc::new(tera)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/session/{id}", get(session_page))
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/{id}", get(get_session))
        .route("/api/v1/sessions/{id}/client", put(update_client))
        .route("/api/v1/sessions/{id}/categories", post(commit_category))
        .route("/api/v1/sessions/{id}/categories/{name}", delete(remove_category))
        .route("/api/v1/sessions/{id}/reset", post(reset_session))
        .route("/api/v1/sessions/{id}/document", post(generate_document))
        .route("/api/v1/catalog", get(get_catalog))
        .route("/api/v1/catalog/reload", post(reload_catalog))
        .with_state(state)
}

/// Landing page: explains the tool and starts a new session.
async fn index_page(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let mut context = Context::new();
    context.insert("company_name", &state.config.company.name);

    let html = state.templates.render("index.html", &context).map_err(template_error)?;
    Ok(Html(html))
}

/// Quoting workspace for one session. The page drives the JSON API.
async fn session_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    if state.sessions.get(&id).is_none() {
        return Err((
            StatusCode::NOT_FOUND,
            Html("<h1>Sesión no encontrada</h1><p>El enlace ha caducado. <a href=\"/\">Empieza un presupuesto nuevo</a>.</p>".to_string()),
        ));
    }

    let mut context = Context::new();
    context.insert("company_name", &state.config.company.name);
    context.insert("session_id", &id);

    let html = state.templates.render("session.html", &context).map_err(template_error)?;
    Ok(Html(html))
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    let session = state.sessions.create();

    info!(
        event_name = "portal.session.created",
        session_id = %session.id,
        "quoting session created"
    );

    (StatusCode::CREATED, Json(session_view(&session, &state.config)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, (StatusCode, Json<ApiError>)> {
    let session = state.sessions.get(&id).ok_or_else(|| session_not_found(id))?;
    Ok(Json(session_view(&session, &state.config)))
}

async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(client): Json<ClientInfo>,
) -> Result<Json<SessionView>, (StatusCode, Json<ApiError>)> {
    let session = state
        .sessions
        .with_session(&id, |session| {
            session.set_client(client);
            session.clone()
        })
        .ok_or_else(|| session_not_found(id))?;

    info!(
        event_name = "portal.session.client_updated",
        session_id = %id,
        "client details updated"
    );

    Ok(Json(session_view(&session, &state.config)))
}

/// Price one category against the current catalog and commit it to the
/// session budget, replacing any previous contribution for that category.
async fn commit_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<SessionView>, (StatusCode, Json<ApiError>)> {
    let catalog = state.catalog.current();
    let detail = compute_category_detail(&catalog, &payload.category, &payload.quantities)
        .map_err(domain_error)?;

    let session = state
        .sessions
        .with_session(&id, |session| {
            session.commit_category(payload.category.as_str(), detail).map(|_| session.clone())
        })
        .ok_or_else(|| session_not_found(id))?
        .map_err(domain_error)?;

    info!(
        event_name = "portal.budget.category_committed",
        session_id = %id,
        category = %payload.category,
        "category committed to the budget"
    );

    Ok(Json(session_view(&session, &state.config)))
}

/// Remove a committed category. Removing one that is not in the budget is
/// a no-op and still returns the current snapshot.
async fn remove_category(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
) -> Result<Json<SessionView>, (StatusCode, Json<ApiError>)> {
    let (removed, session) = state
        .sessions
        .with_session(&id, |session| {
            let removed = session.remove_category(&name).is_some();
            (removed, session.clone())
        })
        .ok_or_else(|| session_not_found(id))?;

    info!(
        event_name = "portal.budget.category_removed",
        session_id = %id,
        category = %name,
        removed,
        "category removal handled"
    );

    Ok(Json(session_view(&session, &state.config)))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, (StatusCode, Json<ApiError>)> {
    let session = state
        .sessions
        .with_session(&id, |session| {
            session.reset();
            session.clone()
        })
        .ok_or_else(|| session_not_found(id))?;

    info!(event_name = "portal.session.reset", session_id = %id, "budget cleared");

    Ok(Json(session_view(&session, &state.config)))
}

/// Assemble and render the quote document for a session.
///
/// The budget and client are validated first so the user gets a correctable
/// message before any rendering work happens, and the session is only marked
/// `Finalized` once a document actually exists.
async fn generate_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DocumentQuery>,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let template = query.template.unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
    if !is_known_template(&template) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError { error: format!("unknown template `{template}`") }),
        ));
    }

    let session = state.sessions.get(&id).ok_or_else(|| session_not_found(id))?;

    if !session.can_transition_to(SessionState::Finalized) {
        return Err(domain_error(DomainError::InvalidSessionTransition {
            state: session.state,
            action: "finalize".to_string(),
        }));
    }
    session.client.validate().map_err(domain_error)?;

    let pricing = &state.config.pricing;
    let totals = compute_quote_totals(&session.budget, pricing.markup_rate, pricing.tax_rate);
    let issued_on = Utc::now().date_naive();
    let reference = quote_reference(session.id, issued_on);

    let document = QuoteDocument::assemble(
        &state.config.company.name,
        &reference,
        &session.client,
        &session.budget,
        &totals,
        pricing.markup_rate,
        pricing.tax_rate,
        issued_on,
    )
    .map_err(domain_error)?;

    let rendered = state.renderer.render(&document, &template).await.map_err(|e| {
        error!(
            event_name = "portal.document.render_failed",
            session_id = %id,
            error = %e,
            "document rendering failed"
        );
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError { error: format!("document rendering failed: {e}") }),
        )
    })?;

    state
        .sessions
        .with_session(&id, |session| session.mark_finalized())
        .ok_or_else(|| session_not_found(id))?
        .map_err(domain_error)?;

    info!(
        event_name = "portal.document.generated",
        session_id = %id,
        reference = %reference,
        template = %template,
        format = rendered.extension(),
        "quote document generated"
    );

    let filename = format!("{reference}.pdf");
    Ok(rendered.into_response(&filename))
}

async fn get_catalog(State(state): State<AppState>) -> Json<CatalogView> {
    let catalog = state.catalog.current();

    Json(CatalogView {
        categories: catalog
            .categories()
            .iter()
            .map(|entry| CatalogCategoryView {
                name: entry.name.clone(),
                items: entry
                    .items
                    .iter()
                    .map(|item| CatalogItemView {
                        concept: item.concept.clone(),
                        unit_price: format_eur(item.unit_price),
                    })
                    .collect(),
            })
            .collect(),
    })
}

/// Explicit catalog reload. On failure the previous table keeps serving.
async fn reload_catalog(
    State(state): State<AppState>,
) -> Result<Json<ReloadView>, (StatusCode, Json<ApiError>)> {
    match state.catalog.reload() {
        Ok(summary) => {
            Ok(Json(ReloadView { categories: summary.categories, items: summary.items }))
        }
        Err(e) => {
            error!(
                event_name = "portal.catalog.reload_failed",
                error = %e,
                "catalog reload failed, previous table still serving"
            );
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError { error: format!("catalog reload failed: {e}") }),
            ))
        }
    }
}

/// Build the display snapshot for one session against the configured rates.
fn session_view(session: &QuoteSession, config: &AppConfig) -> SessionView {
    let pricing = &config.pricing;
    let totals = compute_quote_totals(&session.budget, pricing.markup_rate, pricing.tax_rate);

    SessionView {
        id: session.id,
        created_at: session.created_at,
        state: session.state,
        client: session.client.clone(),
        categories: session
            .budget
            .entries()
            .iter()
            .map(|entry| CategoryView {
                name: entry.category.clone(),
                lines: entry
                    .detail
                    .lines()
                    .iter()
                    .map(|line| LineView {
                        concept: line.concept.clone(),
                        quantity: line.quantity.normalize().to_string(),
                        unit_price: format_eur(line.unit_price),
                        amount: format_eur(line.amount),
                    })
                    .collect(),
                subtotal: format_eur(entry.detail.subtotal()),
            })
            .collect(),
        totals: TotalsView {
            subtotal: format_eur(totals.subtotal),
            markup_label: markup_label(pricing.markup_rate),
            markup: format_eur(totals.markup),
            tax_label: tax_label(pricing.tax_rate),
            tax: format_eur(totals.tax),
            total: format_eur(totals.total),
        },
    }
}

/// Map a quoting failure onto an HTTP response: user-correctable conditions
/// become 422 with the Spanish message; anything else means the page offered
/// an entry the catalog does not have, which is logged as a defect and
/// reported as 400.
fn domain_error(error: DomainError) -> (StatusCode, Json<ApiError>) {
    if error.is_user_correctable() {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(ApiError { error: error.user_message() }))
    } else {
        error!(
            event_name = "portal.defect",
            error = %error,
            "lookup failed for an entry the page should only offer from the catalog"
        );
        (StatusCode::BAD_REQUEST, Json(ApiError { error: error.to_string() }))
    }
}

fn session_not_found(id: Uuid) -> (StatusCode, Json<ApiError>) {
    (StatusCode::NOT_FOUND, Json(ApiError { error: format!("session {id} not found or expired") }))
}

fn template_error(error: tera::Error) -> (StatusCode, Html<String>) {
    error!(error = %error, "portal template rendering failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("<h1>Template Error</h1><pre>{:?}</pre>", error)),
    )
}
