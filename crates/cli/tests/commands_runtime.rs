use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use prodcat_cli::commands::{check, export};
use serde_json::Value;
use tempfile::TempDir;

const SAMPLE_CATALOG: &str = r#"{
  "products": [
    {
      "id": "OLJCESPC7Z",
      "name": "Sunglasses",
      "description": "Add a modern touch to your outfits.",
      "picture": "/static/img/products/sunglasses.jpg",
      "priceUsd": { "currencyCode": "USD", "units": 19, "nanos": 990000000 },
      "categories": ["accessories"]
    },
    {
      "id": "66VCHSJNUP",
      "name": "Tank Top",
      "priceUsd": { "currencyCode": "USD", "units": "18", "nanos": "990000000" },
      "categories": "clothing,tops"
    }
  ]
}"#;

#[test]
fn check_reports_file_catalog_when_database_is_disabled() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("products.json");
    fs::write(&path, SAMPLE_CATALOG).expect("write catalog");

    with_env(&[("PRODCAT_CATALOG_FILE", path.to_str().expect("utf-8 path"))], || {
        let result = check::run();
        assert_eq!(result.exit_code, 0, "expected successful check: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "check");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().expect("message");
        assert!(message.contains("2 products"), "unexpected message: {message}");
        assert!(message.contains("file"), "unexpected message: {message}");
    });
}

#[test]
fn check_classifies_missing_catalog_file_as_io_failure() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("absent.json");

    with_env(&[("PRODCAT_CATALOG_FILE", path.to_str().expect("utf-8 path"))], || {
        let result = check::run();
        assert_eq!(result.exit_code, 4, "expected load failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "io");
    });
}

#[test]
fn check_reports_config_failure_for_incomplete_database_settings() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("products.json");
    fs::write(&path, SAMPLE_CATALOG).expect("write catalog");

    with_env(
        &[
            ("PRODCAT_CATALOG_FILE", path.to_str().expect("utf-8 path")),
            ("ALLOYDB_CLUSTER_NAME", "catalog-cluster"),
        ],
        || {
            let result = check::run();
            assert_eq!(result.exit_code, 4, "expected load failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "config");
        },
    );
}

#[test]
fn check_rejects_invalid_timeout_before_loading() {
    with_env(&[("PRODCAT_ALLOYDB_TIMEOUT_SECS", "0")], || {
        let result = check::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn export_writes_a_document_that_loads_back() {
    let dir = TempDir::new().expect("temp dir");
    let source = dir.path().join("products.json");
    let output = dir.path().join("exported.json");
    fs::write(&source, SAMPLE_CATALOG).expect("write catalog");

    with_env(&[("PRODCAT_CATALOG_FILE", source.to_str().expect("utf-8 path"))], || {
        let result = export::run(&output);
        assert_eq!(result.exit_code, 0, "expected successful export: {}", result.output);
    });

    let exported: Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("read export")).expect("json");
    let products = exported["products"].as_array().expect("products array");
    assert_eq!(products.len(), 2);
    assert_eq!(products[1]["id"], "66VCHSJNUP");
    assert_eq!(products[1]["categories"], serde_json::json!(["clothing", "tops"]));

    with_env(&[("PRODCAT_CATALOG_FILE", output.to_str().expect("utf-8 path"))], || {
        let result = check::run();
        assert_eq!(result.exit_code, 0, "exported catalog should load: {}", result.output);
    });
}

#[test]
fn export_reports_write_failure() {
    let dir = TempDir::new().expect("temp dir");
    let source = dir.path().join("products.json");
    fs::write(&source, SAMPLE_CATALOG).expect("write catalog");
    let output = dir.path().join("missing-dir").join("exported.json");

    with_env(&[("PRODCAT_CATALOG_FILE", source.to_str().expect("utf-8 path"))], || {
        let result = export::run(&output);
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "export_write");
    });
}

#[test]
fn export_reports_load_failure_without_writing() {
    let dir = TempDir::new().expect("temp dir");
    let source = dir.path().join("absent.json");
    let output = dir.path().join("exported.json");

    with_env(&[("PRODCAT_CATALOG_FILE", source.to_str().expect("utf-8 path"))], || {
        let result = export::run(&output);
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "export");
        assert_eq!(payload["error_class"], "io");
    });

    assert!(!output.exists(), "nothing should be written after a failed load");
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid json")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PRODCAT_CATALOG_FILE",
        "PRODCAT_ALLOYDB_PROJECT_ID",
        "PRODCAT_ALLOYDB_REGION",
        "PRODCAT_ALLOYDB_CLUSTER_NAME",
        "PRODCAT_ALLOYDB_INSTANCE_NAME",
        "PRODCAT_ALLOYDB_DATABASE_NAME",
        "PRODCAT_ALLOYDB_TABLE_NAME",
        "PRODCAT_ALLOYDB_PASSWORD",
        "PRODCAT_ALLOYDB_TIMEOUT_SECS",
        "PROJECT_ID",
        "REGION",
        "ALLOYDB_CLUSTER_NAME",
        "ALLOYDB_INSTANCE_NAME",
        "ALLOYDB_DATABASE_NAME",
        "ALLOYDB_TABLE_NAME",
        "ALLOYDB_PASSWORD",
        "PRODCAT_LOGGING_LEVEL",
        "PRODCAT_LOGGING_FORMAT",
        "PRODCAT_LOG_LEVEL",
        "PRODCAT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
