use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use prodcat_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "catalog.file_path",
        &config.catalog.file_path.display().to_string(),
        source("catalog.file_path", &["PRODCAT_CATALOG_FILE"]),
    ));

    let alloydb = &config.alloydb;
    let string_fields: [(&str, &str, [&str; 2]); 8] = [
        ("alloydb.project_id", alloydb.project_id.as_str(), ["PRODCAT_ALLOYDB_PROJECT_ID", "PROJECT_ID"]),
        ("alloydb.region", alloydb.region.as_str(), ["PRODCAT_ALLOYDB_REGION", "REGION"]),
        (
            "alloydb.cluster_name",
            alloydb.cluster_name.as_str(),
            ["PRODCAT_ALLOYDB_CLUSTER_NAME", "ALLOYDB_CLUSTER_NAME"],
        ),
        (
            "alloydb.instance_name",
            alloydb.instance_name.as_str(),
            ["PRODCAT_ALLOYDB_INSTANCE_NAME", "ALLOYDB_INSTANCE_NAME"],
        ),
        (
            "alloydb.database_name",
            alloydb.database_name.as_str(),
            ["PRODCAT_ALLOYDB_DATABASE_NAME", "ALLOYDB_DATABASE_NAME"],
        ),
        (
            "alloydb.table_name",
            alloydb.table_name.as_str(),
            ["PRODCAT_ALLOYDB_TABLE_NAME", "ALLOYDB_TABLE_NAME"],
        ),
        ("alloydb.user", alloydb.user.as_str(), ["PRODCAT_ALLOYDB_USER", "ALLOYDB_USER"]),
        (
            "alloydb.proxy_host",
            alloydb.proxy_host.as_str(),
            ["PRODCAT_ALLOYDB_PROXY_HOST", "ALLOYDB_PROXY_HOST"],
        ),
    ];
    for (key_path, value, env_keys) in string_fields {
        lines.push(render_line(key_path, display_or_unset(value), source(key_path, &env_keys)));
    }

    let password = if alloydb.password.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "alloydb.password",
        password,
        source("alloydb.password", &["PRODCAT_ALLOYDB_PASSWORD", "ALLOYDB_PASSWORD"]),
    ));
    lines.push(render_line(
        "alloydb.proxy_port",
        &alloydb.proxy_port.to_string(),
        source("alloydb.proxy_port", &["PRODCAT_ALLOYDB_PROXY_PORT"]),
    ));
    lines.push(render_line(
        "alloydb.max_connections",
        &alloydb.max_connections.to_string(),
        source("alloydb.max_connections", &["PRODCAT_ALLOYDB_MAX_CONNECTIONS"]),
    ));
    lines.push(render_line(
        "alloydb.timeout_secs",
        &alloydb.timeout_secs.to_string(),
        source("alloydb.timeout_secs", &["PRODCAT_ALLOYDB_TIMEOUT_SECS"]),
    ));
    lines.push(format!(
        "- load plan = {}",
        if alloydb.is_enabled() { "database, then file" } else { "file only" }
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["PRODCAT_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        source("server.health_check_port", &["PRODCAT_SERVER_HEALTH_CHECK_PORT"]),
    ));
    lines.push(render_line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        source("server.graceful_shutdown_secs", &["PRODCAT_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["PRODCAT_LOGGING_LEVEL", "PRODCAT_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["PRODCAT_LOGGING_FORMAT", "PRODCAT_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["prodcat.toml", "config/prodcat.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn display_or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "<unset>"
    } else {
        value
    }
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
