//! Unit tests for error and fault display text.

use std::time::Duration;

use serde_json::json;

use devtools_link::{AppError, Fault, RequestError};

#[test]
fn app_error_display_prefixes() {
    assert_eq!(AppError::Config("bad".into()).to_string(), "config: bad");
    assert_eq!(
        AppError::Transport("closed".into()).to_string(),
        "transport: closed"
    );
    assert_eq!(AppError::Codec("long".into()).to_string(), "codec: long");
    assert_eq!(AppError::Io("eof".into()).to_string(), "io: eof");
    assert_eq!(
        AppError::Shutdown("stopped".into()).to_string(),
        "shutdown: stopped"
    );
}

#[test]
fn io_error_converts_to_io_variant() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone");
    let err = AppError::from(io);

    assert!(matches!(err, AppError::Io(ref msg) if msg.contains("pipe gone")));
}

#[test]
fn request_error_display() {
    assert_eq!(
        RequestError::TransportWrite("socket closed".into()).to_string(),
        "send failed: socket closed"
    );
    assert_eq!(RequestError::Shutdown.to_string(), "client shutdown");
    assert_eq!(
        RequestError::Timeout {
            timeout: Duration::from_millis(50)
        }
        .to_string(),
        "request timeout after 50ms"
    );
    assert_eq!(
        RequestError::InvalidResponse.to_string(),
        "invalid response: neither result nor error"
    );
}

#[test]
fn protocol_error_display_includes_code_when_present() {
    let with_code = RequestError::Protocol {
        message: "Not found".into(),
        code: Some(-32000),
        data: Some(json!({"detail": 1})),
    };
    let without_code = RequestError::Protocol {
        message: "Not found".into(),
        code: None,
        data: None,
    };

    assert_eq!(with_code.to_string(), "protocol error -32000: Not found");
    assert_eq!(without_code.to_string(), "protocol error: Not found");
}

#[test]
fn request_error_predicates() {
    assert!(RequestError::Shutdown.is_shutdown());
    assert!(!RequestError::Shutdown.is_timeout());
    assert!(RequestError::Timeout {
        timeout: Duration::from_secs(1)
    }
    .is_timeout());
    assert!(!RequestError::InvalidResponse.is_shutdown());
}

#[test]
fn fault_display() {
    let malformed = Fault::MalformedPayload {
        reason: "malformed json: eof".into(),
    };
    let handler = Fault::HandlerFault {
        method: "Page.loadEventFired".into(),
        reason: "boom".into(),
    };

    assert_eq!(malformed.to_string(), "malformed payload: malformed json: eof");
    assert_eq!(
        handler.to_string(),
        "event handler for Page.loadEventFired failed: boom"
    );
}
