//! Dedup/rate-limit store.
//!
//! A time-bounded cache mapping fingerprint to a "recently reported" marker.
//! Injected into the eligibility filter rather than reached as ambient state,
//! so multi-process deployments can substitute a shared TTL cache.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Presence cache with per-entry TTL.
///
/// `put` followed by `has` on the same key must observe presence until the
/// TTL elapses; an expired entry must never report as present. The
/// check-then-insert race between two reporting calls is tolerated - rate
/// limiting here is advisory, and the worst case is one extra report.
pub trait DedupStore: Send + Sync {
    fn has(&self, key: &str) -> bool;
    fn put(&self, key: &str, ttl: Duration);
}

/// In-memory store for single-process deployments.
///
/// Entries expire lazily on `has`; distinct fingerprints are bounded in
/// practice by the number of distinct error sites, so no background eviction
/// is needed.
#[derive(Default)]
pub struct InMemoryDedupStore {
    deadlines: DashMap<String, Instant>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

impl DedupStore for InMemoryDedupStore {
    fn has(&self, key: &str) -> bool {
        if let Some(entry) = self.deadlines.get(key) {
            if *entry > Instant::now() {
                return true;
            }
            drop(entry);
            self.deadlines.remove(key);
        }
        false
    }

    fn put(&self, key: &str, ttl: Duration) {
        self.deadlines.insert(key.to_string(), Instant::now() + ttl);
    }
}
