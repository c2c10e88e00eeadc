//! Unit tests for tracing bootstrap.
//!
//! A global subscriber can be installed only once per process, so these
//! tests run serially and tolerate whichever of them installs it first.

use serial_test::serial;

use devtools_link::config::{LogFormat, LoggingConfig};
use devtools_link::logging::init_tracing;
use devtools_link::AppError;

#[test]
#[serial]
fn second_text_init_is_rejected() {
    let config = LoggingConfig::default();

    let _ = init_tracing(&config);
    let err = init_tracing(&config).expect_err("subscriber already installed");

    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("failed to init tracing")));
}

#[test]
#[serial]
fn json_init_after_existing_subscriber_is_rejected() {
    let config = LoggingConfig {
        format: LogFormat::Json,
        filter: "debug".into(),
    };

    let _ = init_tracing(&config);
    assert!(matches!(
        init_tracing(&config),
        Err(AppError::Config(_))
    ));
}
