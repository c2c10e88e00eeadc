//! Error types shared across the crate.
//!
//! Three families live here:
//!
//! - [`AppError`]: setup and plumbing failures (configuration, transport,
//!   framing, I/O) returned through the crate-wide [`Result`].
//! - [`RequestError`]: the failure half of a request [`Outcome`], delivered
//!   through the same completion channel as a successful result.
//! - [`Fault`]: non-fatal internal faults routed to the diagnostic hook
//!   installed with [`Client::set_error_handler`](crate::Client::set_error_handler).

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde_json::Value;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Final value observed by the caller of [`Client::send`](crate::Client::send).
pub type Outcome = std::result::Result<Value, RequestError>;

/// Application error enumeration covering setup and plumbing failures.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The transport refused or failed an outbound write.
    Transport(String),
    /// Stream framing failure (oversize or invalid frame).
    Codec(String),
    /// File-system or stream I/O failure.
    Io(String),
    /// Operation refused because the client is shutting down.
    Shutdown(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Codec(msg) => write!(f, "codec: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Shutdown(msg) => write!(f, "shutdown: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Why a request did not produce a result.
///
/// Every pending request resolves exactly once, either with a result value or
/// with one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The request could not be handed to the transport.
    TransportWrite(String),
    /// The client was shutting down when the request was issued or while it
    /// was in flight.
    Shutdown,
    /// The peer answered with an `error` object.
    Protocol {
        /// Human-readable message from the error object.
        message: String,
        /// Numeric error code, when the peer supplied one.
        code: Option<i64>,
        /// Additional error payload, when the peer supplied one.
        data: Option<Value>,
    },
    /// No response arrived within the request's timeout.
    Timeout {
        /// The timeout the request was issued with.
        timeout: Duration,
    },
    /// The response carried neither `result` nor `error`.
    InvalidResponse,
}

impl RequestError {
    /// Whether this error came from the client tearing down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// Whether this error is a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl Display for RequestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransportWrite(msg) => write!(f, "send failed: {msg}"),
            Self::Shutdown => write!(f, "client shutdown"),
            Self::Protocol {
                message,
                code: Some(code),
                ..
            } => write!(f, "protocol error {code}: {message}"),
            Self::Protocol { message, .. } => write!(f, "protocol error: {message}"),
            Self::Timeout { timeout } => {
                write!(f, "request timeout after {}ms", timeout.as_millis())
            }
            Self::InvalidResponse => write!(f, "invalid response: neither result nor error"),
        }
    }
}

impl std::error::Error for RequestError {}

/// Non-fatal fault raised while processing inbound traffic.
///
/// Faults never reach a request caller. They are logged and handed to the
/// diagnostic hook, and the inbound worker carries on with the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// An inbound payload was not valid JSON or not a JSON object.
    MalformedPayload {
        /// Parser diagnostic.
        reason: String,
    },
    /// An event handler returned an error or panicked.
    HandlerFault {
        /// Event method whose handler failed.
        method: String,
        /// Error text or panic message.
        reason: String,
    },
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedPayload { reason } => write!(f, "malformed payload: {reason}"),
            Self::HandlerFault { method, reason } => {
                write!(f, "event handler for {method} failed: {reason}")
            }
        }
    }
}
