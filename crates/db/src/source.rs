use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use prodcat_core::catalog::{Catalog, SourceKind};
use prodcat_core::config::{AlloyDbConfig, AlloyDbSettings};
use prodcat_core::errors::LoadError;
use prodcat_core::loader::CatalogSource;

use crate::connection::{connect_pool, DbPool, DialerFactory, SecureDialer};
use crate::row::{catalog_query, ProductRow};

pub struct AlloyDbCatalogSource {
    config: AlloyDbConfig,
    dialer_factory: Arc<dyn DialerFactory>,
}

impl AlloyDbCatalogSource {
    pub fn new(config: AlloyDbConfig, dialer_factory: Arc<dyn DialerFactory>) -> Self {
        Self { config, dialer_factory }
    }
}

#[async_trait]
impl CatalogSource for AlloyDbCatalogSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Database
    }

    async fn load_catalog(&self) -> Result<Catalog, LoadError> {
        load_from_database(&self.config, self.dialer_factory.as_ref()).await
    }
}

/// Loads the full catalog from AlloyDB.
///
/// The dialer and pool are created for this call only and released on every
/// exit path, including when the returned future is dropped mid-load. Each
/// network phase is bounded by `timeout_secs`.
pub async fn load_from_database(
    config: &AlloyDbConfig,
    dialer_factory: &dyn DialerFactory,
) -> Result<Catalog, LoadError> {
    let settings =
        config.connection_settings().map_err(|error| LoadError::Config(error.to_string()))?;
    let query = catalog_query(&settings.table_name);

    info!(
        event_name = "catalog.database.start",
        instance_uri = %settings.instance_uri,
        database = %settings.database_name,
        table = %settings.table_name,
        "loading catalog from database"
    );

    let dialer = DialerLease::new(
        dialer_factory.create().await.map_err(|error| LoadError::Connection(error.to_string()))?,
    );
    let result = load_with_dialer(dialer.dialer(), &settings, &query).await;
    dialer.release().await;

    if let Ok(catalog) = &result {
        info!(
            event_name = "catalog.database.loaded",
            table = %settings.table_name,
            product_count = catalog.len(),
            "catalog loaded from database"
        );
    }
    result
}

/// Owns the dialer for one load. If the load is cancelled before
/// [`DialerLease::release`] runs, the close is finished on a spawned task.
struct DialerLease {
    dialer: Arc<dyn SecureDialer>,
    released: bool,
}

impl DialerLease {
    fn new(dialer: Box<dyn SecureDialer>) -> Self {
        Self { dialer: Arc::from(dialer), released: false }
    }

    fn dialer(&self) -> &dyn SecureDialer {
        self.dialer.as_ref()
    }

    async fn release(mut self) {
        self.released = true;
        self.dialer.close().await;
    }
}

impl Drop for DialerLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                event_name = "catalog.database.dialer_leaked",
                "dialer dropped outside a runtime; close skipped"
            );
            return;
        };
        let dialer = Arc::clone(&self.dialer);
        runtime.spawn(async move { dialer.close().await });
    }
}

async fn load_with_dialer(
    dialer: &dyn SecureDialer,
    settings: &AlloyDbSettings,
    query: &str,
) -> Result<Catalog, LoadError> {
    let deadline = Duration::from_secs(settings.timeout_secs.max(1));

    let target = within(deadline, dialer.dial(&settings.instance_uri))
        .await
        .map_err(LoadError::Connection)?
        .map_err(|error| LoadError::Connection(error.to_string()))?;

    let pool = within(deadline, connect_pool(&target, settings))
        .await
        .map_err(LoadError::Connection)?
        .map_err(|error| LoadError::Connection(error.to_string()))?;

    let result = fetch_catalog(&pool, query, deadline).await;
    pool.close().await;
    result
}

async fn fetch_catalog(pool: &DbPool, query: &str, deadline: Duration) -> Result<Catalog, LoadError> {
    let rows = run_query(deadline, sqlx::query(query).fetch_all(pool)).await?;

    let mut products = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let product = ProductRow::from_pg_row(row)
            .map_err(|error| LoadError::RowMapping(format!("row {index}: {error}")))?
            .into_product()
            .map_err(|error| LoadError::RowMapping(format!("row {index}: {error}")))?;

        debug!(
            event_name = "catalog.database.row_mapped",
            product_id = %product.id,
            name = %product.name,
            categories = ?product.categories,
            "mapped catalog row"
        );
        products.push(product);
    }

    Ok(Catalog::new(products))
}

/// Bounds the catalog query. A timeout and a driver error are both `Query`.
async fn run_query<T, F>(deadline: Duration, fetch: F) -> Result<T, LoadError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    within(deadline, fetch)
        .await
        .map_err(LoadError::Query)?
        .map_err(|error| LoadError::Query(error.to_string()))
}

async fn within<F: Future>(deadline: Duration, future: F) -> Result<F::Output, String> {
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| format!("timed out after {deadline:?}"))
}
