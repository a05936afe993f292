//! Quote document rendering.
//!
//! Turns an assembled [`QuoteDocument`] into HTML via Tera templates and,
//! when `wkhtmltopdf` is installed, into a PDF via an external conversion
//! step. Every number that reaches a template is already rounded and
//! formatted upstream, so templates stay free of arithmetic and filters.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use std::process::Stdio;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

use reforma_core::document::QuoteDocument;

/// Template used when a request does not name one.
pub const DEFAULT_TEMPLATE: &str = "presupuesto";

/// Templates shipped with the application.
pub const TEMPLATES: [&str; 2] = ["presupuesto", "resumen"];

/// Whether `name` is one of the shipped quote templates.
pub fn is_known_template(name: &str) -> bool {
    TEMPLATES.contains(&name)
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders quote documents to HTML or PDF.
#[derive(Clone, Debug)]
pub struct DocumentRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
}

impl DocumentRenderer {
    /// Create a renderer loading templates from the given directory.
    pub fn new(template_dir: &str) -> Result<Self, RenderError> {
        let tera = Tera::new(&format!("{}/**/*", template_dir))
            .map_err(|e| RenderError::Template(e.to_string()))?;

        Ok(Self { tera, wkhtmltopdf_path: detect_wkhtmltopdf() })
    }

    /// Create a renderer backed by the templates compiled into the binary.
    /// Used as a fallback when the filesystem templates are missing.
    pub fn with_embedded_templates() -> Self {
        let mut tera = Tera::default();

        tera.add_raw_template(
            "presupuesto.html.tera",
            include_str!("../../../templates/quotes/presupuesto.html.tera"),
        )
        .expect("embedded presupuesto template should parse");

        tera.add_raw_template(
            "resumen.html.tera",
            include_str!("../../../templates/quotes/resumen.html.tera"),
        )
        .expect("embedded resumen template should parse");

        Self { tera, wkhtmltopdf_path: detect_wkhtmltopdf() }
    }

    /// Whether this renderer can produce PDF output.
    pub fn pdf_enabled(&self) -> bool {
        self.wkhtmltopdf_path.is_some()
    }

    /// Render the document with the named template.
    ///
    /// Produces a PDF when `wkhtmltopdf` is available and falls back to
    /// the rendered HTML when it is not, or when the conversion fails.
    pub async fn render(
        &self,
        document: &QuoteDocument,
        template: &str,
    ) -> Result<RenderedDocument, RenderError> {
        let html = self.render_html(document, template)?;

        if let Some(ref wkhtmltopdf) = self.wkhtmltopdf_path {
            match convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(pdf_bytes) => Ok(RenderedDocument::Pdf(pdf_bytes)),
                Err(e) => {
                    warn!(error = %e, "PDF conversion failed, falling back to HTML");
                    Ok(RenderedDocument::Html(html))
                }
            }
        } else {
            Ok(RenderedDocument::Html(html))
        }
    }

    /// Render the document to HTML only, for browser viewing and printing.
    pub fn render_html(
        &self,
        document: &QuoteDocument,
        template: &str,
    ) -> Result<String, RenderError> {
        let context = Context::from_serialize(document)
            .map_err(|e| RenderError::Template(e.to_string()))?;

        let template_name = format!("{}.html.tera", template);
        self.tera
            .render(&template_name, &context)
            .map_err(|e| RenderError::Template(e.to_string()))
    }
}

/// Convert HTML to PDF by shelling out to wkhtmltopdf.
async fn convert_html_to_pdf(html: &str, wkhtmltopdf_path: &str) -> Result<Vec<u8>, RenderError> {
    let temp_dir = std::env::temp_dir();
    let stem = uuid::Uuid::new_v4();
    let html_path = temp_dir.join(format!("presupuesto_{}.html", stem));
    let pdf_path = temp_dir.join(format!("presupuesto_{}.pdf", stem));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .arg("--page-size")
        .arg("A4")
        .arg("--margin-top")
        .arg("10mm")
        .arg("--margin-bottom")
        .arg("10mm")
        .arg("--margin-left")
        .arg("10mm")
        .arg("--margin-right")
        .arg("10mm")
        .arg("--encoding")
        .arg("utf-8")
        .arg("--enable-local-file-access")
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(stderr = %stderr, "wkhtmltopdf failed");
        let _ = tokio::fs::remove_file(&html_path).await;
        return Err(RenderError::Conversion(stderr.to_string()));
    }

    let pdf_bytes = tokio::fs::read(&pdf_path).await?;

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    info!(size = pdf_bytes.len(), "PDF generated successfully");

    Ok(pdf_bytes)
}

/// Output of a render call.
pub enum RenderedDocument {
    Pdf(Vec<u8>),
    Html(String),
}

impl RenderedDocument {
    /// File extension matching the payload.
    pub fn extension(&self) -> &'static str {
        match self {
            RenderedDocument::Pdf(_) => "pdf",
            RenderedDocument::Html(_) => "html",
        }
    }

    /// Raw payload bytes, for writing to disk.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RenderedDocument::Pdf(bytes) => bytes,
            RenderedDocument::Html(html) => html.into_bytes(),
        }
    }

    /// Convert to an Axum response. PDF payloads download under `filename`;
    /// HTML payloads are served inline for the browser to print.
    pub fn into_response(self, filename: &str) -> Response {
        match self {
            RenderedDocument::Pdf(bytes) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/pdf")
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                )
                .body(Body::from(bytes))
                .unwrap(),
            RenderedDocument::Html(html) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
                .body(Body::from(html))
                .unwrap(),
        }
    }
}

/// Check if wkhtmltopdf is available
pub fn is_wkhtmltopdf_available() -> bool {
    which::which("wkhtmltopdf").is_ok()
}

fn detect_wkhtmltopdf() -> Option<String> {
    let path = which::which("wkhtmltopdf").ok().map(|p| p.to_string_lossy().to_string());

    match path {
        Some(ref found) => info!(path = %found, "wkhtmltopdf found"),
        None => warn!("wkhtmltopdf not found in PATH, quote downloads will serve HTML"),
    }

    path
}
