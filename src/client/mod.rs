//! Request/response correlation client.
//!
//! A [`Client`] sits between callers and a message-oriented [`Transport`]:
//!
//! ```text
//! caller ── send() ──► outbound gate ──► Transport::write
//! transport ── handle_message() ──► inbound queue ──► worker ──┬─► pending table
//!                                                              └─► event registry
//! sweeper ── every sweep_interval ──► pending table (timeouts)
//! ```
//!
//! Every request resolves exactly once, with a result, a protocol error, a
//! timeout, a transport write failure or a shutdown error. All inbound traffic
//! is processed in arrival order by a single worker task, so event handlers
//! and response resolutions never run concurrently with each other.
//!
//! Submodules:
//! - `correlator`: pending table plus unmatched response cache.
//! - `events`: method → handler registry.
//! - `inbound`: worker loop and dispatch.
//! - `pending`: completion cell and [`ResponseHandle`].
//! - `sweeper`: background timeout enforcement.
//! - `shutdown`: ordered teardown.

mod correlator;
pub mod events;
mod inbound;
pub mod pending;
mod shutdown;
mod sweeper;
mod unmatched;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use self::correlator::{Correlator, Registration};
use self::events::{EventHandler, EventRegistry, HandlerResult, Subscribe};
use self::pending::{PendingRequest, ResponseHandle};
use crate::config::ClientConfig;
use crate::errors::{Fault, RequestError};
use crate::models::envelope::RequestEnvelope;
use crate::transport::Transport;
use crate::{AppError, Result};

/// Diagnostic hook receiving non-fatal inbound faults.
pub type ErrorHook = Arc<dyn Fn(&Fault) + Send + Sync>;

/// Point-in-time counters for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientStats {
    /// Requests awaiting a response.
    pub pending: usize,
    /// Responses held in the unmatched cache.
    pub unmatched: usize,
    /// Methods with an active event handler.
    pub subscriptions: usize,
    /// Inbound payloads dropped because the queue was full.
    pub dropped_inbound: u64,
}

#[derive(Default)]
struct Tasks {
    worker: Option<JoinHandle<()>>,
    sweeper: Option<JoinHandle<()>>,
}

pub(crate) struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
    /// Only flipped while `write_gate` is held.
    shutting_down: AtomicBool,
    /// Serializes transport writes so concurrent senders never interleave.
    write_gate: Mutex<()>,
    /// Set to `true` once teardown has finished.
    teardown_done: watch::Sender<bool>,
    runtime: Handle,
    correlator: Correlator,
    events: EventRegistry,
    error_hook: Mutex<Option<ErrorHook>>,
    inbound_tx: mpsc::Sender<String>,
    dropped_inbound: AtomicU64,
    worker_cancel: CancellationToken,
    sweeper_cancel: CancellationToken,
    tasks: Mutex<Tasks>,
}

impl Inner {
    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Log `fault` and hand it to the diagnostic hook, if one is installed.
    pub(crate) fn report(&self, fault: &Fault) {
        warn!(%fault, "inbound fault");

        let hook = self
            .error_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(hook) = hook {
            if catch_unwind(AssertUnwindSafe(|| hook(fault))).is_err() {
                error!("error handler panicked");
            }
        }
    }

    /// Remove `request` from the table and fail it.
    fn abandon(&self, request: &PendingRequest, err: RequestError) {
        self.correlator.remove(request.id());
        request.complete(Err(err));
    }
}

/// Cloneable handle to a running correlation client.
///
/// Clones share one instance. Call [`shutdown`](Self::shutdown) to stop the
/// background tasks and fail outstanding requests; dropping the last clone
/// without it lets the tasks wind down on their own and any still-pending
/// handles resolve with [`RequestError::Shutdown`].
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("active", &self.is_active())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Start a client over `transport` and spawn its worker and sweeper tasks.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `config` fails validation or if called
    /// outside a tokio runtime.
    pub fn start(transport: Arc<dyn Transport>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|err| AppError::Config(format!("client requires a tokio runtime: {err}")))?;

        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_queue_capacity);
        let inner = Arc::new(Inner {
            correlator: Correlator::new(config.unmatched_limit),
            config,
            transport,
            next_id: AtomicU64::new(1),
            shutting_down: AtomicBool::new(false),
            write_gate: Mutex::new(()),
            teardown_done: watch::channel(false).0,
            runtime: runtime.clone(),
            events: EventRegistry::default(),
            error_hook: Mutex::new(None),
            inbound_tx,
            dropped_inbound: AtomicU64::new(0),
            worker_cancel: CancellationToken::new(),
            sweeper_cancel: CancellationToken::new(),
            tasks: Mutex::new(Tasks::default()),
        });

        let worker = runtime.spawn(
            inbound::run_worker(
                Arc::downgrade(&inner),
                inbound_rx,
                inner.worker_cancel.clone(),
            )
            .instrument(info_span!("inbound_worker")),
        );
        let sweeper = runtime.spawn(
            sweeper::run_sweeper(
                Arc::downgrade(&inner),
                inner.config.sweep_interval(),
                inner.sweeper_cancel.clone(),
            )
            .instrument(info_span!("request_sweeper")),
        );
        *inner.tasks.lock().unwrap_or_else(PoisonError::into_inner) = Tasks {
            worker: Some(worker),
            sweeper: Some(sweeper),
        };

        info!(
            queue_capacity = inner.config.inbound_queue_capacity,
            sweep_interval_ms = inner.config.sweep_interval_ms,
            "correlation client started"
        );
        Ok(Self { inner })
    }

    /// Issue `method` with `params` and return a handle for its outcome.
    ///
    /// Never blocks on the peer. If the client is shutting down the handle is
    /// already failed with [`RequestError::Shutdown`] and the transport is not
    /// touched. A `null` `params` is sent as `{}`.
    pub fn send(&self, method: &str, params: Value, timeout: Duration) -> ResponseHandle {
        let inner = &self.inner;
        if inner.is_shutting_down() {
            debug!(method, "send refused, client shutting down");
            return ResponseHandle::failed(RequestError::Shutdown);
        }

        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (request, handle) = PendingRequest::new(id, method, timeout);

        if inner.correlator.register(&request) == Registration::ResolvedFromCache {
            return handle;
        }

        let params = if params.is_null() {
            Value::Object(Map::new())
        } else {
            params
        };
        let payload = match (RequestEnvelope {
            id,
            method,
            params: &params,
        })
        .to_json()
        {
            Ok(payload) => payload,
            Err(err) => {
                inner.abandon(&request, RequestError::TransportWrite(err.to_string()));
                return handle;
            }
        };

        let _gate = inner
            .write_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if inner.is_shutting_down() {
            debug!(id, method, "shutdown observed before write, aborting send");
            inner.abandon(&request, RequestError::Shutdown);
            return handle;
        }

        if let Err(err) = inner.transport.write(&payload) {
            warn!(id, method, %err, "transport write failed");
            inner.abandon(&request, RequestError::TransportWrite(err.to_string()));
        }

        handle
    }

    /// [`send`](Self::send) with the configured default timeout.
    pub fn send_default(&self, method: &str, params: Value) -> ResponseHandle {
        self.send(method, params, self.inner.config.default_timeout())
    }

    /// Register `handler` for events named `method`, replacing any previous one.
    ///
    /// Handlers run on the inbound worker, one message at a time; a slow
    /// handler delays every message queued behind it. A handler must not wait
    /// on a [`ResponseHandle`], since the response it waits for is queued
    /// behind the handler itself.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shutdown` once shutdown has started.
    pub fn on<F>(&self, method: &str, handler: F) -> Result<()>
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        if self.inner.is_shutting_down() {
            return Err(AppError::Shutdown(format!(
                "cannot subscribe to {method} while shutting down"
            )));
        }

        let handler: EventHandler = Arc::new(handler);
        match self.inner.events.insert(method, handler) {
            Subscribe::Registered => debug!(method, "event handler registered"),
            Subscribe::Replaced => debug!(method, "event handler replaced"),
            Subscribe::Closed => {
                return Err(AppError::Shutdown(format!(
                    "cannot subscribe to {method} while shutting down"
                )));
            }
        }
        Ok(())
    }

    /// Remove the handler for `method`, if any.
    pub fn off(&self, method: &str) {
        if self.inner.events.remove(method) {
            debug!(method, "event handler removed");
        }
    }

    /// Install the diagnostic hook for malformed payloads and handler faults.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&Fault) + Send + Sync + 'static,
    {
        *self
            .inner
            .error_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    /// Accept one inbound frame from the transport.
    ///
    /// Never blocks and never parses: the payload is queued for the worker, or
    /// dropped with a warning when the queue is full or the client is
    /// shutting down.
    pub fn handle_message(&self, payload: impl Into<String>) {
        let inner = &self.inner;
        if inner.is_shutting_down() {
            return;
        }

        match inner.inbound_tx.try_send(payload.into()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = inner.dropped_inbound.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    capacity = inner.config.inbound_queue_capacity,
                    dropped, "inbound queue full, dropping message"
                );
            }
            Err(TrySendError::Closed(_)) => {
                debug!("inbound queue closed, dropping message");
            }
        }
    }

    /// Whether shutdown has not started yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.inner.is_shutting_down()
    }

    /// Whether `id` is still awaiting a response.
    #[must_use]
    pub fn is_pending(&self, id: u64) -> bool {
        self.inner.correlator.contains(id)
    }

    /// Snapshot of the client's counters.
    #[must_use]
    pub fn stats(&self) -> ClientStats {
        let inner = &self.inner;
        ClientStats {
            pending: inner.correlator.pending_len(),
            unmatched: inner.correlator.unmatched_len(),
            subscriptions: inner.events.len(),
            dropped_inbound: inner.dropped_inbound.load(Ordering::Relaxed),
        }
    }

    /// Configuration the client was started with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}
