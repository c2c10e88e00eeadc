//! Pending request table and unmatched response cache.
//!
//! The two maps have separate locks. Any operation that checks one against the
//! other takes them in the order table → cache, so a response can never be
//! cached in the gap between a sender registering and looking in the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::pending::PendingRequest;
use super::unmatched::UnmatchedCache;
use crate::models::envelope::ResponsePayload;

/// Result of registering a new pending request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Registration {
    /// Registered; the request must now be written.
    Registered,
    /// A cached response already resolved the request; nothing to write.
    ResolvedFromCache,
}

/// Result of routing an inbound response.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Routed {
    /// Delivered to its pending request.
    Delivered,
    /// The pending request had already been resolved elsewhere.
    AlreadyResolved,
    /// No pending request; stored in the unmatched cache.
    Cached,
}

#[derive(Debug)]
pub(crate) struct Correlator {
    pending: Mutex<HashMap<u64, Arc<PendingRequest>>>,
    unmatched: Mutex<UnmatchedCache>,
}

impl Correlator {
    pub(crate) fn new(unmatched_limit: usize) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            unmatched: Mutex::new(UnmatchedCache::new(unmatched_limit)),
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<u64, Arc<PendingRequest>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache(&self) -> MutexGuard<'_, UnmatchedCache> {
        self.unmatched.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `request`, then claim any response that outran it.
    pub(crate) fn register(&self, request: &Arc<PendingRequest>) -> Registration {
        let mut table = self.table();
        table.insert(request.id(), Arc::clone(request));

        let cached = self.cache().take(request.id());
        match cached {
            Some(payload) => {
                table.remove(&request.id());
                drop(table);
                debug!(id = request.id(), "request resolved from unmatched cache");
                request.complete(payload.into_outcome());
                Registration::ResolvedFromCache
            }
            None => Registration::Registered,
        }
    }

    /// Remove `id` from the table, returning the entry if it was still there.
    pub(crate) fn remove(&self, id: u64) -> Option<Arc<PendingRequest>> {
        self.table().remove(&id)
    }

    /// Hand a response to its pending request, or cache it.
    pub(crate) fn route(&self, id: u64, payload: ResponsePayload) -> Routed {
        let mut table = self.table();
        let Some(request) = table.remove(&id) else {
            self.cache().insert(id, payload);
            drop(table);
            debug!(id, "no pending request for response, cached");
            return Routed::Cached;
        };
        drop(table);

        if request.complete(payload.into_outcome()) {
            Routed::Delivered
        } else {
            Routed::AlreadyResolved
        }
    }

    /// Remove and return every request whose timeout has elapsed.
    pub(crate) fn take_expired(&self, now: Instant) -> Vec<Arc<PendingRequest>> {
        let mut table = self.table();
        let expired: Vec<u64> = table
            .values()
            .filter(|request| request.is_expired(now))
            .map(|request| request.id())
            .collect();
        expired.iter().filter_map(|id| table.remove(id)).collect()
    }

    /// Remove and return every pending request.
    pub(crate) fn drain(&self) -> Vec<Arc<PendingRequest>> {
        self.table().drain().map(|(_, request)| request).collect()
    }

    /// Drop unmatched responses older than `ttl`.
    pub(crate) fn trim_unmatched(&self, now: Instant, ttl: Duration) {
        let dropped = self.cache().trim(now, ttl);
        if dropped > 0 {
            info!(dropped, "expired unmatched responses discarded");
        }
    }

    pub(crate) fn clear_unmatched(&self) {
        self.cache().clear();
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.table().len()
    }

    pub(crate) fn unmatched_len(&self) -> usize {
        self.cache().len()
    }

    pub(crate) fn contains(&self, id: u64) -> bool {
        self.table().contains_key(&id)
    }
}
