use std::sync::Arc;

use tracing::{error, info};

use crate::catalog::{Catalog, CatalogStore, StoreStatus};
use crate::errors::LoadError;
use crate::loader::{CatalogLoader, RefreshOutcome};

/// The two catalog operations the serving layer consumes.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<CatalogStore>,
    loader: Arc<CatalogLoader>,
}

impl CatalogService {
    pub fn new(store: Arc<CatalogStore>, loader: Arc<CatalogLoader>) -> Self {
        Self { store, loader }
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    pub async fn refresh_catalog(&self) -> Result<RefreshOutcome, LoadError> {
        match self.loader.load(&self.store).await {
            Ok(outcome) => {
                info!(
                    event_name = "catalog.refresh.published",
                    correlation_id = %format!("refresh-{}", outcome.generation),
                    source = outcome.source.as_str(),
                    product_count = outcome.product_count,
                    "catalog snapshot published"
                );
                Ok(outcome)
            }
            Err(load_error) => {
                error!(
                    event_name = "catalog.refresh.failed",
                    error_class = load_error.error_class(),
                    origin = ?load_error.origin(),
                    error = %load_error,
                    "catalog refresh failed; previous snapshot kept"
                );
                Err(load_error)
            }
        }
    }

    pub fn current_catalog(&self) -> Arc<Catalog> {
        self.store.current()
    }

    pub fn status(&self) -> StoreStatus {
        self.store.status()
    }
}
