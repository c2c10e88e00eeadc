#![forbid(unsafe_code)]

//! Asynchronous request/response correlation over a JSON-envelope protocol.
//!
//! Numbered requests go out through a [`Transport`]; correlated responses and
//! unsolicited named events come back through [`Client::handle_message`].
//! The wire shape follows remote-debugging protocols such as the Chrome
//! DevTools Protocol, but nothing here depends on a particular domain.
//!
//! ```rust,ignore
//! let session = devtools_link::transport::attach(stdout, stdin, ClientConfig::default())?;
//! let client = session.client();
//! client.on("Page.loadEventFired", |params| {
//!     tracing::info!(?params, "page loaded");
//!     Ok(())
//! })?;
//! let result = client
//!     .send("Runtime.evaluate", json!({"expression": "1 + 1"}), Duration::from_secs(5))
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod transport;

pub use client::events::{HandlerError, HandlerResult};
pub use client::pending::ResponseHandle;
pub use client::{Client, ClientStats, ErrorHook};
pub use config::ClientConfig;
pub use errors::{AppError, Fault, Outcome, RequestError, Result};
pub use transport::Transport;
