//! Catalog snapshots and the process-scoped store that publishes them.
//!
//! Readers take a lock-free `Arc<Catalog>` from an `ArcSwap`. Loads are
//! serialized by a separate async mutex and finish with one atomic swap of
//! the published snapshot, so a slow build never blocks readers.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use crate::domain::product::{Product, ProductId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Database,
    File,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::File => "file",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn find(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == product_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreStatus {
    pub generation: u64,
    pub product_count: usize,
    pub source: Option<SourceKind>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl StoreStatus {
    pub fn is_loaded(&self) -> bool {
        self.generation > 0
    }
}

struct Published {
    catalog: Arc<Catalog>,
    generation: u64,
    source: Option<SourceKind>,
    loaded_at: Option<DateTime<Utc>>,
}

impl Default for Published {
    fn default() -> Self {
        Self { catalog: Arc::new(Catalog::default()), generation: 0, source: None, loaded_at: None }
    }
}

pub struct CatalogStore {
    current: ArcSwap<Published>,
    refresh: Mutex<()>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self { current: ArcSwap::from_pointee(Published::default()), refresh: Mutex::new(()) }
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live snapshot. Starts out empty until the first publish.
    pub fn current(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.load().catalog)
    }

    pub fn status(&self) -> StoreStatus {
        let current = self.current.load_full();
        StoreStatus {
            generation: current.generation,
            product_count: current.catalog.len(),
            source: current.source,
            loaded_at: current.loaded_at,
        }
    }

    /// Waits for exclusive load access. Only the returned guard can publish.
    pub async fn begin_refresh(&self) -> RefreshGuard<'_> {
        RefreshGuard { store: self, _exclusive: self.refresh.lock().await }
    }
}

pub struct RefreshGuard<'a> {
    store: &'a CatalogStore,
    _exclusive: MutexGuard<'a, ()>,
}

impl RefreshGuard<'_> {
    /// Installs a fully built catalog and returns its generation number.
    pub fn publish(&self, catalog: Catalog, source: SourceKind) -> u64 {
        let generation = self.store.current.load().generation + 1;
        self.store.current.store(Arc::new(Published {
            catalog: Arc::new(catalog),
            generation,
            source: Some(source),
            loaded_at: Some(Utc::now()),
        }));
        generation
    }
}
