//! Ordered, idempotent teardown.
//!
//! Teardown runs on its own task, started by the first [`Client::shutdown`]
//! call. Every caller, first or not, waits on `teardown_done`, so dropping a
//! caller's future never abandons the teardown halfway.

use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};

use super::{Client, Inner};
use crate::errors::RequestError;

impl Client {
    /// Stop the client and wait until teardown has finished.
    ///
    /// The first call starts the teardown; concurrent and later calls wait
    /// for the same teardown. Steps run strictly in order:
    ///
    /// 1. raise the shutdown flag (new sends, subscriptions and inbound frames
    ///    are refused from here on);
    /// 2. stop the inbound worker and wait for it to drain the queue;
    /// 3. stop the sweeper and wait for it;
    /// 4. fail every remaining pending request with [`RequestError::Shutdown`];
    /// 5. clear the unmatched response cache;
    /// 6. close the event registry.
    ///
    /// Cancelling the returned future does not cancel the teardown.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        if inner.raise_shutdown_flag() {
            info!(
                pending = inner.correlator.pending_len(),
                "correlation client shutting down"
            );
            inner.runtime.spawn(
                Arc::clone(inner)
                    .teardown()
                    .instrument(info_span!("client_shutdown")),
            );
        } else {
            debug!("shutdown already started, waiting for it to finish");
        }

        let mut done = inner.teardown_done.subscribe();
        // `self` keeps the sender alive, so this only returns once teardown
        // has published completion.
        if done.wait_for(|finished| *finished).await.is_err() {
            debug!("teardown signal dropped");
        }
    }
}

impl Inner {
    /// Flip the shutdown flag. Returns `true` for the one caller that did.
    ///
    /// Holding the write gate means no transport write is in progress, so
    /// every write either completed before the flag rose or never starts.
    fn raise_shutdown_flag(&self) -> bool {
        let _gate = self
            .write_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.shutting_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    async fn teardown(self: Arc<Self>) {
        let (worker, sweeper) = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            (tasks.worker.take(), tasks.sweeper.take())
        };

        self.worker_cancel.cancel();
        join("inbound worker", worker).await;

        self.sweeper_cancel.cancel();
        join("sweeper", sweeper).await;

        let failed = self
            .correlator
            .drain()
            .into_iter()
            .filter(|request| request.complete(Err(RequestError::Shutdown)))
            .count();

        self.correlator.clear_unmatched();
        self.events.close();

        info!(failed, "correlation client shut down");
        self.teardown_done.send_replace(true);
    }
}

async fn join(task: &'static str, handle: Option<JoinHandle<()>>) {
    let Some(handle) = handle else {
        return;
    };
    if let Err(err) = handle.await {
        error!(task, %err, "background task ended abnormally");
    }
}
