//! Stale request sweeper.
//!
//! Wakes every `sweep_interval`, fails every pending request whose timeout
//! has elapsed, and trims old entries from the unmatched response cache.

use std::sync::Weak;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Inner;
use crate::errors::RequestError;

pub(crate) async fn run_sweeper(
    inner: Weak<Inner>,
    sweep_interval: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("sweeper cancelled");
                break;
            }
            _ = interval.tick() => {
                let Some(client) = inner.upgrade() else {
                    break;
                };
                client.sweep(Instant::now());
            }
        }
    }
}

impl Inner {
    /// Fail expired requests and trim the unmatched cache. Returns the number
    /// of requests this sweep timed out.
    pub(crate) fn sweep(&self, now: Instant) -> usize {
        let mut timed_out = 0;
        for request in self.correlator.take_expired(now) {
            let timeout = request.timeout();
            // A response that slipped in first keeps its result.
            if request.complete(Err(RequestError::Timeout { timeout })) {
                timed_out += 1;
                warn!(
                    id = request.id(),
                    method = request.method(),
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "request timed out"
                );
            }
        }

        self.correlator
            .trim_unmatched(now, self.config.unmatched_ttl());
        timed_out
    }
}
