pub mod connection;
pub mod row;
pub mod source;

use std::sync::Arc;

use prodcat_core::catalog::CatalogStore;
use prodcat_core::config::AppConfig;
use prodcat_core::loader::{CatalogLoader, CatalogSource, FileCatalogSource, LoadPlan};
use prodcat_core::service::CatalogService;

pub use connection::{
    connect_pool, DbPool, DialError, DialTarget, DialerFactory, ProxyDialerFactory, SecureDialer,
};
pub use row::{catalog_query, ProductRow, RowDecodeError};
pub use source::{load_from_database, AlloyDbCatalogSource};

/// Builds a loader whose plan and sources follow `config`.
pub fn build_loader(config: &AppConfig) -> CatalogLoader {
    let plan = LoadPlan::from_config(config);
    let file: Arc<dyn CatalogSource> =
        Arc::new(FileCatalogSource::new(config.catalog.file_path.clone()));
    let database = plan.uses_database().then(|| {
        let factory = Arc::new(ProxyDialerFactory::from_config(&config.alloydb));
        Arc::new(AlloyDbCatalogSource::new(config.alloydb.clone(), factory)) as Arc<dyn CatalogSource>
    });

    CatalogLoader::new(plan, file, database)
}

/// Wires an empty store and a config-driven loader into a catalog service.
pub fn build_catalog_service(config: &AppConfig) -> CatalogService {
    CatalogService::new(Arc::new(CatalogStore::new()), Arc::new(build_loader(config)))
}
