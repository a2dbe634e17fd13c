pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod loader;
pub mod mapping;
pub mod service;

pub use catalog::{Catalog, CatalogStore, SourceKind, StoreStatus};
pub use domain::product::{Money, Product, ProductId};
pub use errors::{LoadError, LoadOrigin};
pub use loader::{CatalogLoader, CatalogSource, LoadPlan, RefreshOutcome};
pub use service::CatalogService;
