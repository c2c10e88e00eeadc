//! Shared fixtures for integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use devtools_link::{AppError, Client, ClientConfig, Fault, Transport};

/// Transport that records every outbound message, or fails on demand.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
}

impl RecordingTransport {
    /// Every message written so far, parsed as JSON.
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).expect("outbound message is JSON"))
            .collect()
    }

    /// Make every later write fail with `reason`.
    pub fn fail_writes(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_owned());
    }
}

impl Transport for RecordingTransport {
    fn write(&self, text: &str) -> devtools_link::Result<()> {
        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(AppError::Transport(reason));
        }
        self.sent.lock().unwrap().push(text.to_owned());
        Ok(())
    }
}

/// Configuration with a short sweep period so timeouts fire quickly.
pub fn fast_config() -> ClientConfig {
    ClientConfig {
        sweep_interval_ms: 10,
        ..ClientConfig::default()
    }
}

/// Start a client over a fresh [`RecordingTransport`].
pub fn start_client(config: ClientConfig) -> (Client, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let client = Client::start(transport.clone(), config).expect("client starts");
    (client, transport)
}

/// Install an error hook that collects every fault.
pub fn collect_faults(client: &Client) -> Arc<Mutex<Vec<Fault>>> {
    let faults = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&faults);
    client.set_error_handler(move |fault| sink.lock().unwrap().push(fault.clone()));
    faults
}

/// Poll `condition` until it holds, panicking after two seconds.
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Await a future with a generous guard against hangs.
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("operation did not complete in time")
}
