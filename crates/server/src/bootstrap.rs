use prodcat_core::config::AppConfig;
use prodcat_core::errors::LoadError;
use prodcat_core::service::CatalogService;
use prodcat_db::build_catalog_service;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub catalog: CatalogService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("initial catalog load failed: {0}")]
    InitialLoad(#[source] LoadError),
}

/// Builds the catalog service and performs the first load. Without a
/// catalog nothing can be served, so any failure here aborts startup.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        catalog_file = %config.catalog.file_path.display(),
        database_enabled = config.alloydb.is_enabled(),
        "starting application bootstrap"
    );

    let catalog = build_catalog_service(&config);
    let outcome = catalog.refresh_catalog().await.map_err(BootstrapError::InitialLoad)?;
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        source = outcome.source.as_str(),
        product_count = outcome.product_count,
        "initial catalog loaded"
    );

    Ok(Application { config, catalog })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use prodcat_core::catalog::SourceKind;
    use prodcat_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use prodcat_core::errors::LoadError;
    use tempfile::TempDir;

    use crate::bootstrap::{bootstrap_with_config, BootstrapError};

    fn config_for(file_path: PathBuf) -> AppConfig {
        AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                catalog_file_path: Some(file_path),
                alloydb_cluster_name: Some(String::new()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config should load")
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_catalog_file_is_missing() {
        let dir = TempDir::new().expect("temp dir");

        let result = bootstrap_with_config(config_for(dir.path().join("products.json"))).await;

        assert!(matches!(result, Err(BootstrapError::InitialLoad(LoadError::Io { .. }))));
    }

    #[tokio::test]
    async fn bootstrap_publishes_file_catalog() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("products.json");
        fs::write(
            &path,
            r#"{"products":[{"id":"L9ECAV7KIM","name":"Loafers","priceUsd":{"currencyCode":"USD","units":89,"nanos":990000000},"categories":["footwear"]}]}"#,
        )
        .expect("write catalog");

        let app = bootstrap_with_config(config_for(path)).await.expect("bootstrap should succeed");

        let status = app.catalog.status();
        assert_eq!(status.generation, 1);
        assert_eq!(status.product_count, 1);
        assert_eq!(status.source, Some(SourceKind::File));
    }
}
