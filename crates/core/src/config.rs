use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub alloydb: AlloyDbConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub file_path: PathBuf,
}

/// Settings for the optional AlloyDB catalog source.
///
/// A non-empty `cluster_name` switches the database branch on. The remaining
/// fields are only checked when that branch actually runs.
#[derive(Clone, Debug)]
pub struct AlloyDbConfig {
    pub project_id: String,
    pub region: String,
    pub cluster_name: String,
    pub instance_name: String,
    pub database_name: String,
    pub table_name: String,
    pub user: String,
    pub password: Option<SecretString>,
    pub proxy_host: String,
    pub proxy_port: u16,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Fully validated connection parameters for one database load.
#[derive(Clone, Debug)]
pub struct AlloyDbSettings {
    pub instance_uri: String,
    pub database_name: String,
    pub table_name: String,
    pub user: String,
    pub password: SecretString,
    pub proxy_host: String,
    pub proxy_port: u16,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_file_path: Option<PathBuf>,
    pub alloydb_cluster_name: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig { file_path: PathBuf::from("products.json") },
            alloydb: AlloyDbConfig {
                project_id: String::new(),
                region: String::new(),
                cluster_name: String::new(),
                instance_name: String::new(),
                database_name: String::new(),
                table_name: String::new(),
                user: "postgres".to_string(),
                password: None,
                proxy_host: "127.0.0.1".to_string(),
                proxy_port: 5432,
                max_connections: 4,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("prodcat.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(file_path) = catalog.file_path {
                self.catalog.file_path = file_path;
            }
        }

        if let Some(alloydb) = patch.alloydb {
            let target = &mut self.alloydb;
            let text_fields = [
                (alloydb.project_id, &mut target.project_id),
                (alloydb.region, &mut target.region),
                (alloydb.cluster_name, &mut target.cluster_name),
                (alloydb.instance_name, &mut target.instance_name),
                (alloydb.database_name, &mut target.database_name),
                (alloydb.table_name, &mut target.table_name),
                (alloydb.user, &mut target.user),
                (alloydb.proxy_host, &mut target.proxy_host),
            ];
            for (value, slot) in text_fields {
                if let Some(value) = value {
                    *slot = value;
                }
            }
            if let Some(password_value) = alloydb.password {
                target.password = Some(secret_value(password_value));
            }
            if let Some(proxy_port) = alloydb.proxy_port {
                target.proxy_port = proxy_port;
            }
            if let Some(max_connections) = alloydb.max_connections {
                target.max_connections = max_connections;
            }
            if let Some(timeout_secs) = alloydb.timeout_secs {
                target.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRODCAT_CATALOG_FILE") {
            self.catalog.file_path = PathBuf::from(value);
        }

        // The unprefixed names match the variables the legacy deployment
        // manifests already export.
        let alloydb = &mut self.alloydb;
        let text_vars = [
            ("PRODCAT_ALLOYDB_PROJECT_ID", "PROJECT_ID", &mut alloydb.project_id),
            ("PRODCAT_ALLOYDB_REGION", "REGION", &mut alloydb.region),
            ("PRODCAT_ALLOYDB_CLUSTER_NAME", "ALLOYDB_CLUSTER_NAME", &mut alloydb.cluster_name),
            ("PRODCAT_ALLOYDB_INSTANCE_NAME", "ALLOYDB_INSTANCE_NAME", &mut alloydb.instance_name),
            ("PRODCAT_ALLOYDB_DATABASE_NAME", "ALLOYDB_DATABASE_NAME", &mut alloydb.database_name),
            ("PRODCAT_ALLOYDB_TABLE_NAME", "ALLOYDB_TABLE_NAME", &mut alloydb.table_name),
            ("PRODCAT_ALLOYDB_USER", "ALLOYDB_USER", &mut alloydb.user),
            ("PRODCAT_ALLOYDB_PROXY_HOST", "ALLOYDB_PROXY_HOST", &mut alloydb.proxy_host),
        ];
        for (key, alias, slot) in text_vars {
            if let Some(value) = read_env(key).or_else(|| read_env(alias)) {
                *slot = value;
            }
        }

        let password = read_env("PRODCAT_ALLOYDB_PASSWORD").or_else(|| read_env("ALLOYDB_PASSWORD"));
        if let Some(value) = password {
            alloydb.password = Some(secret_value(value));
        }
        if let Some(value) = read_env("PRODCAT_ALLOYDB_PROXY_PORT") {
            alloydb.proxy_port = parse_u16("PRODCAT_ALLOYDB_PROXY_PORT", &value)?;
        }
        if let Some(value) = read_env("PRODCAT_ALLOYDB_MAX_CONNECTIONS") {
            alloydb.max_connections = parse_u32("PRODCAT_ALLOYDB_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("PRODCAT_ALLOYDB_TIMEOUT_SECS") {
            alloydb.timeout_secs = parse_u64("PRODCAT_ALLOYDB_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PRODCAT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PRODCAT_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("PRODCAT_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("PRODCAT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PRODCAT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("PRODCAT_LOGGING_LEVEL").or_else(|| read_env("PRODCAT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRODCAT_LOGGING_FORMAT").or_else(|| read_env("PRODCAT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(file_path) = overrides.catalog_file_path {
            self.catalog.file_path = file_path;
        }
        if let Some(cluster_name) = overrides.alloydb_cluster_name {
            self.alloydb.cluster_name = cluster_name;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_alloydb_limits(&self.alloydb)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl AlloyDbConfig {
    pub fn is_enabled(&self) -> bool {
        !self.cluster_name.trim().is_empty()
    }

    pub fn instance_uri(&self) -> String {
        format!(
            "projects/{}/locations/{}/clusters/{}/instances/{}",
            self.project_id, self.region, self.cluster_name, self.instance_name
        )
    }

    /// Checks every field the database branch needs and returns the settings
    /// for a single load.
    pub fn connection_settings(&self) -> Result<AlloyDbSettings, ConfigError> {
        let required = [
            ("alloydb.project_id", &self.project_id),
            ("alloydb.region", &self.region),
            ("alloydb.cluster_name", &self.cluster_name),
            ("alloydb.instance_name", &self.instance_name),
            ("alloydb.database_name", &self.database_name),
            ("alloydb.table_name", &self.table_name),
            ("alloydb.user", &self.user),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Validation(format!(
                "database catalog source is enabled but {} must be set",
                missing.join(", ")
            )));
        }

        if !is_sql_identifier(&self.table_name) {
            return Err(ConfigError::Validation(format!(
                "alloydb.table_name `{}` must be a plain or schema-qualified SQL identifier",
                self.table_name
            )));
        }

        let password = self
            .password
            .as_ref()
            .filter(|value| !value.expose_secret().trim().is_empty())
            .cloned()
            .ok_or_else(|| {
                ConfigError::Validation(
                    "alloydb.password is required; set PRODCAT_ALLOYDB_PASSWORD or ALLOYDB_PASSWORD"
                        .to_string(),
                )
            })?;

        Ok(AlloyDbSettings {
            instance_uri: self.instance_uri(),
            database_name: self.database_name.clone(),
            table_name: self.table_name.clone(),
            user: self.user.clone(),
            password,
            proxy_host: self.proxy_host.clone(),
            proxy_port: self.proxy_port,
            max_connections: self.max_connections,
            timeout_secs: self.timeout_secs,
        })
    }
}

fn is_sql_identifier(value: &str) -> bool {
    let segments: Vec<&str> = value.split('.').collect();
    segments.len() <= 2
        && segments.iter().all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
                && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        })
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("prodcat.toml"), PathBuf::from("config/prodcat.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.file_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("catalog.file_path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_alloydb_limits(alloydb: &AlloyDbConfig) -> Result<(), ConfigError> {
    if alloydb.max_connections == 0 {
        return Err(ConfigError::Validation(
            "alloydb.max_connections must be greater than zero".to_string(),
        ));
    }

    if alloydb.timeout_secs == 0 || alloydb.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "alloydb.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    alloydb: Option<AlloyDbPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    file_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct AlloyDbPatch {
    project_id: Option<String>,
    region: Option<String>,
    cluster_name: Option<String>,
    instance_name: Option<String>,
    database_name: Option<String>,
    table_name: Option<String>,
    user: Option<String>,
    password: Option<String>,
    proxy_host: Option<String>,
    proxy_port: Option<u16>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
