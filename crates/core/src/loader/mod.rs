//! Source selection and snapshot commit.
//!
//! The plan is derived from configuration once per loader: when the AlloyDB
//! cluster name is set the database source runs first, and the file source
//! always runs last. The file snapshot therefore always wins, even after a
//! successful database load. That fallthrough mirrors the service this
//! replaces and is pinned by `database_then_file_keeps_file_catalog`; the
//! database result is only used to fail fast on infrastructure errors.

pub mod file;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogStore, SourceKind};
use crate::config::AppConfig;
use crate::errors::LoadError;

pub use file::{load_from_file, write_catalog_file, FileCatalogSource};

/// One strategy that produces a complete catalog snapshot.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn load_catalog(&self) -> Result<Catalog, LoadError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadPlan {
    steps: Vec<SourceKind>,
}

impl LoadPlan {
    pub fn from_config(config: &AppConfig) -> Self {
        if config.alloydb.is_enabled() {
            Self::database_then_file()
        } else {
            Self::file_only()
        }
    }

    pub fn file_only() -> Self {
        Self { steps: vec![SourceKind::File] }
    }

    pub fn database_then_file() -> Self {
        Self { steps: vec![SourceKind::Database, SourceKind::File] }
    }

    pub fn steps(&self) -> &[SourceKind] {
        &self.steps
    }

    pub fn uses_database(&self) -> bool {
        self.steps.contains(&SourceKind::Database)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub generation: u64,
    pub source: SourceKind,
    pub product_count: usize,
}

pub struct CatalogLoader {
    plan: LoadPlan,
    file: Arc<dyn CatalogSource>,
    database: Option<Arc<dyn CatalogSource>>,
}

impl CatalogLoader {
    pub fn new(
        plan: LoadPlan,
        file: Arc<dyn CatalogSource>,
        database: Option<Arc<dyn CatalogSource>>,
    ) -> Self {
        Self { plan, file, database }
    }

    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    fn source_for(&self, kind: SourceKind) -> Result<&dyn CatalogSource, LoadError> {
        let source = match kind {
            SourceKind::File => self.file.as_ref(),
            SourceKind::Database => self.database.as_deref().ok_or_else(|| {
                LoadError::Config("database catalog source is enabled but not wired".to_string())
            })?,
        };

        if source.kind() != kind {
            return Err(LoadError::Config(format!(
                "{} source wired into the {} step",
                source.kind().as_str(),
                kind.as_str()
            )));
        }
        Ok(source)
    }

    /// Runs every planned source while holding exclusive load access, then
    /// publishes the last snapshot. Nothing is published if any step fails.
    pub async fn load(&self, store: &CatalogStore) -> Result<RefreshOutcome, LoadError> {
        let guard = store.begin_refresh().await;
        let mut built: Option<(SourceKind, Catalog)> = None;

        for &kind in self.plan.steps() {
            let source = self.source_for(kind)?;
            info!(event_name = "catalog.source.start", source = kind.as_str(), "loading catalog source");

            let catalog = source.load_catalog().await.map_err(|error| {
                warn!(
                    event_name = "catalog.source.failed",
                    source = kind.as_str(),
                    error_class = error.error_class(),
                    error = %error,
                    "catalog source failed"
                );
                error
            })?;

            if let Some((previous, discarded)) = built.replace((kind, catalog)) {
                warn!(
                    event_name = "catalog.source.superseded",
                    discarded_source = previous.as_str(),
                    discarded_products = discarded.len(),
                    winning_source = kind.as_str(),
                    "earlier catalog snapshot replaced by a later source"
                );
            }
        }

        let (source, catalog) = built
            .ok_or_else(|| LoadError::Config("catalog load plan has no sources".to_string()))?;
        let product_count = catalog.len();
        let generation = guard.publish(catalog, source);

        Ok(RefreshOutcome { generation, source, product_count })
    }
}
