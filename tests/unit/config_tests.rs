//! Unit tests for configuration parsing and validation.

use std::io::Write;
use std::time::Duration;

use devtools_link::config::{ClientConfig, LogFormat};
use devtools_link::AppError;

#[test]
fn empty_document_yields_defaults() {
    let config = ClientConfig::from_toml_str("").expect("empty config is valid");

    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.inbound_queue_capacity, 1000);
    assert_eq!(config.unmatched_limit, 1000);
    assert_eq!(config.unmatched_ttl(), Duration::from_secs(30));
    assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    assert_eq!(config.default_timeout(), Duration::from_secs(30));
    assert_eq!(config.max_frame_bytes, 1_048_576);
    assert_eq!(config.logging.format, LogFormat::Text);
    assert_eq!(config.logging.filter, "info");
}

#[test]
fn explicit_values_override_defaults() {
    let toml = r#"
inbound_queue_capacity = 16
unmatched_limit = 4
unmatched_ttl_seconds = 5
sweep_interval_ms = 50
default_timeout_ms = 250

[logging]
format = "json"
filter = "devtools_link=debug"
"#;

    let config = ClientConfig::from_toml_str(toml).expect("valid config");

    assert_eq!(config.inbound_queue_capacity, 16);
    assert_eq!(config.unmatched_limit, 4);
    assert_eq!(config.unmatched_ttl(), Duration::from_secs(5));
    assert_eq!(config.sweep_interval(), Duration::from_millis(50));
    assert_eq!(config.default_timeout(), Duration::from_millis(250));
    assert_eq!(config.outbound_queue_capacity, 1000);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.filter, "devtools_link=debug");
}

#[test]
fn zero_capacity_is_rejected() {
    let err = ClientConfig::from_toml_str("inbound_queue_capacity = 0")
        .expect_err("zero capacity must fail");

    assert!(matches!(err, AppError::Config(_)));
    assert!(
        err.to_string().contains("inbound_queue_capacity"),
        "error should name the field: {err}"
    );
}

#[test]
fn zero_sweep_interval_is_rejected() {
    let config = ClientConfig {
        sweep_interval_ms: 0,
        ..ClientConfig::default()
    };

    let err = config.validate().expect_err("zero interval must fail");
    assert!(err.to_string().contains("sweep_interval_ms"));
}

#[test]
fn malformed_toml_is_config_error() {
    let err = ClientConfig::from_toml_str("inbound_queue_capacity = \"lots\"")
        .expect_err("type mismatch must fail");

    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn load_from_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "default_timeout_ms = 1500").expect("write config");

    let config = ClientConfig::load_from_path(file.path()).expect("load config");

    assert_eq!(config.default_timeout(), Duration::from_millis(1500));
}

#[test]
fn load_from_missing_path_is_config_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.toml");

    let err = ClientConfig::load_from_path(&missing).expect_err("missing file");

    assert!(matches!(err, AppError::Config(_)));
    assert!(err.to_string().contains("failed to read config"));
}
