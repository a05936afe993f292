use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tera::Tera;
use tracing::info;

use reforma_core::catalog::{load_catalog_from_path, Catalog, CatalogError};
use reforma_core::config::AppConfig;
use reforma_render::DocumentRenderer;

use crate::sessions::SessionStore;

/// Process-wide price catalog with explicit reload.
///
/// Readers take a snapshot `Arc<Catalog>` and price against it; a reload
/// builds a fresh catalog off to the side and swaps the pointer atomically.
/// A failed reload leaves the previous catalog serving.
#[derive(Clone, Debug)]
pub struct CatalogHandle {
    current: Arc<ArcSwap<Catalog>>,
    path: Arc<PathBuf>,
}

/// Counts reported after a successful reload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReloadSummary {
    pub categories: usize,
    pub items: usize,
}

impl CatalogHandle {
    /// Load the price table once at startup. Any `CatalogError` here is
    /// fatal; the caller refuses to boot.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        let catalog = load_catalog_from_path(path.as_path())?;

        info!(
            event_name = "catalog.loaded",
            path = %path.display(),
            categories = catalog.len(),
            items = catalog.item_count(),
            "price catalog loaded"
        );

        Ok(Self { current: Arc::new(ArcSwap::from_pointee(catalog)), path: Arc::new(path) })
    }

    /// Snapshot of the catalog as of this call.
    pub fn current(&self) -> Arc<Catalog> {
        self.current.load_full()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the price table and swap it in atomically.
    pub fn reload(&self) -> Result<ReloadSummary, CatalogError> {
        let catalog = load_catalog_from_path(self.path.as_path())?;
        let summary = ReloadSummary { categories: catalog.len(), items: catalog.item_count() };
        self.current.store(Arc::new(catalog));

        info!(
            event_name = "catalog.reloaded",
            path = %self.path.display(),
            categories = summary.categories,
            items = summary.items,
            "price catalog reloaded"
        );

        Ok(summary)
    }
}

/// Shared state behind every route handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: CatalogHandle,
    pub sessions: SessionStore,
    pub renderer: Arc<DocumentRenderer>,
    pub templates: Arc<Tera>,
}
