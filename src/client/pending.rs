//! In-flight request bookkeeping and the caller-side completion handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::{Outcome, RequestError};

/// A request that has been registered but not yet resolved.
///
/// `completed` is the single arbitration point between response arrival,
/// timeout sweep, send failure and shutdown: whichever caller flips it first
/// delivers the outcome, every later caller is a no-op.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    id: u64,
    method: String,
    issued_at: Instant,
    timeout: Duration,
    completed: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl PendingRequest {
    /// Create a pending entry issued now, paired with the caller's handle.
    pub(crate) fn new(id: u64, method: &str, timeout: Duration) -> (Arc<Self>, ResponseHandle) {
        let (tx, rx) = oneshot::channel();
        let pending = Arc::new(Self {
            id,
            method: method.to_owned(),
            issued_at: Instant::now(),
            timeout,
            completed: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
        });
        (pending, ResponseHandle { id: Some(id), rx })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether more than `timeout` has elapsed since issue.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) > self.timeout
    }

    /// Deliver `outcome` if nobody has resolved this request yet.
    ///
    /// Returns `true` when this call won the race.
    pub(crate) fn complete(&self, outcome: Outcome) -> bool {
        if self.completed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(tx) = tx {
            if tx.send(outcome).is_err() {
                debug!(id = self.id, "response handle dropped before resolution");
            }
        }
        true
    }
}

/// Caller-side handle for one request.
///
/// Await it (it is a [`Future`]) or call [`blocking_wait`](Self::blocking_wait)
/// from outside the runtime. The outcome is delivered exactly once; polling
/// again after it has been observed is not supported.
#[derive(Debug)]
pub struct ResponseHandle {
    id: Option<u64>,
    rx: oneshot::Receiver<Outcome>,
}

impl ResponseHandle {
    /// A handle that is already resolved with `err` and owns no id.
    pub(crate) fn failed(err: RequestError) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(Err(err));
        Self { id: None, rx }
    }

    /// Correlation id, or `None` if the request was refused before one was
    /// allocated.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// Take the outcome if it is already available, without waiting.
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(RequestError::Shutdown)),
        }
    }

    /// Block the current thread until the outcome arrives.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context; use
    /// `.await` there instead.
    #[must_use]
    pub fn blocking_wait(self) -> Outcome {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(RequestError::Shutdown))
    }
}

impl Future for ResponseHandle {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RequestError::Shutdown)))
    }
}
