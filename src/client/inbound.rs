//! Inbound worker: drains the queue and dispatches one message at a time.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Weak;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::correlator::Routed;
use super::Inner;
use crate::errors::Fault;
use crate::models::envelope::{parse_inbound, Inbound};

/// Worker loop. Runs until `cancel` fires, then processes whatever is still
/// queued before returning.
pub(crate) async fn run_worker(
    inner: Weak<Inner>,
    mut inbound_rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        let payload = tokio::select! {
            biased;

            () = cancel.cancelled() => break,
            payload = inbound_rx.recv() => payload,
        };

        // Every sender lives in `Inner`, so a closed queue means the client
        // itself is gone.
        let Some(payload) = payload else {
            debug!("inbound queue closed, worker exiting");
            return;
        };
        let Some(client) = inner.upgrade() else {
            return;
        };
        client.process_message(&payload);
    }

    inbound_rx.close();
    let Some(client) = inner.upgrade() else {
        return;
    };

    let mut drained = 0_usize;
    while let Some(payload) = inbound_rx.recv().await {
        client.process_message(&payload);
        drained += 1;
    }
    debug!(drained, "inbound worker drained queue");
}

impl Inner {
    /// Parse one payload and route it to a pending request or event handler.
    pub(crate) fn process_message(&self, payload: &str) {
        if payload.trim().is_empty() {
            return;
        }

        let message = match parse_inbound(payload) {
            Ok(message) => message,
            Err(reason) => {
                self.report(&Fault::MalformedPayload { reason });
                return;
            }
        };

        match message {
            Inbound::Response { id, payload } => match self.correlator.route(id, payload) {
                Routed::Delivered => trace!(id, "response delivered"),
                Routed::AlreadyResolved => debug!(id, "response for already resolved request"),
                Routed::Cached => {}
            },
            Inbound::Event { method, params } => self.dispatch_event(&method, &params),
            Inbound::Unroutable => debug!("inbound message has neither id nor method, ignored"),
        }
    }

    fn dispatch_event(&self, method: &str, params: &Value) {
        let Some(handler) = self.events.get(method) else {
            trace!(method, "no handler for event");
            return;
        };

        let reason = match catch_unwind(AssertUnwindSafe(|| handler(params))) {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        self.report(&Fault::HandlerFault {
            method: method.to_owned(),
            reason,
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("handler panicked: {msg}")
    } else {
        "handler panicked".to_owned()
    }
}
