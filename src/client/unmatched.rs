//! Responses that arrived with no pending request to claim them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::models::envelope::ResponsePayload;

#[derive(Debug)]
struct Entry {
    payload: ResponsePayload,
    received_at: Instant,
}

/// Count-capped map of correlation id to unclaimed response.
///
/// Inserting a new id at the cap clears the whole cache first.
#[derive(Debug)]
pub(crate) struct UnmatchedCache {
    entries: HashMap<u64, Entry>,
    limit: usize,
}

impl UnmatchedCache {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            limit,
        }
    }

    /// Store a response, clearing the cache first if it is full.
    pub(crate) fn insert(&mut self, id: u64, payload: ResponsePayload) {
        if self.entries.len() >= self.limit && !self.entries.contains_key(&id) {
            warn!(
                limit = self.limit,
                "unmatched response cache full, clearing"
            );
            self.entries.clear();
        }
        self.entries.insert(
            id,
            Entry {
                payload,
                received_at: Instant::now(),
            },
        );
    }

    /// Remove and return the response for `id`, if held.
    pub(crate) fn take(&mut self, id: u64) -> Option<ResponsePayload> {
        self.entries.remove(&id).map(|entry| entry.payload)
    }

    /// Drop entries older than `ttl`; returns how many were dropped.
    pub(crate) fn trim(&mut self, now: Instant, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.received_at) <= ttl);
        before - self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
