//! Dialer seam and pool construction for the AlloyDB catalog source.
//!
//! The secure dialer resolves a logical instance path such as
//! `projects/p/locations/r/clusters/c/instances/i` to a socket endpoint and
//! takes care of authentication and encryption on that hop. Each load creates
//! its own dialer through a [`DialerFactory`] and closes it when done.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use thiserror::Error;

use prodcat_core::config::{AlloyDbConfig, AlloyDbSettings};

pub type DbPool = sqlx::PgPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialTarget {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialError {
    #[error("secure dialer could not be created: {0}")]
    Setup(String),
    #[error("instance `{instance_uri}` could not be resolved: {message}")]
    Resolve { instance_uri: String, message: String },
}

#[async_trait]
pub trait SecureDialer: Send + Sync {
    async fn dial(&self, instance_uri: &str) -> Result<DialTarget, DialError>;
    async fn close(&self);
}

#[async_trait]
pub trait DialerFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn SecureDialer>, DialError>;
}

/// Dials through a local auth-proxy listener that fronts the instance.
pub struct ProxyDialer {
    target: DialTarget,
}

#[async_trait]
impl SecureDialer for ProxyDialer {
    async fn dial(&self, instance_uri: &str) -> Result<DialTarget, DialError> {
        tracing::debug!(
            event_name = "catalog.database.dial",
            instance_uri,
            proxy = %format!("{}:{}", self.target.host, self.target.port),
            "routing instance connection through auth proxy"
        );
        Ok(self.target.clone())
    }

    async fn close(&self) {}
}

#[derive(Clone, Debug)]
pub struct ProxyDialerFactory {
    host: String,
    port: u16,
}

impl ProxyDialerFactory {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn from_config(config: &AlloyDbConfig) -> Self {
        Self::new(config.proxy_host.clone(), config.proxy_port)
    }
}

#[async_trait]
impl DialerFactory for ProxyDialerFactory {
    async fn create(&self) -> Result<Box<dyn SecureDialer>, DialError> {
        if self.host.trim().is_empty() || self.port == 0 {
            return Err(DialError::Setup(format!(
                "auth proxy address `{}:{}` is not usable",
                self.host, self.port
            )));
        }
        Ok(Box::new(ProxyDialer { target: DialTarget { host: self.host.clone(), port: self.port } }))
    }
}

/// Opens a pool against the dialed endpoint. TLS is left to the dialer hop.
pub async fn connect_pool(
    target: &DialTarget,
    settings: &AlloyDbSettings,
) -> Result<DbPool, sqlx::Error> {
    let options = PgConnectOptions::new()
        .host(&target.host)
        .port(target.port)
        .username(&settings.user)
        .password(settings.password.expose_secret())
        .database(&settings.database_name)
        .ssl_mode(PgSslMode::Disable);

    PgPoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(settings.timeout_secs.max(1)))
        .connect_with(options)
        .await
}
