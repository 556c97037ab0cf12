//! Store metrics registry
//!
//! - Counters only, monotonic
//! - Reset only when the store is opened
//! - Relaxed atomics; exact values, no ordering guarantees between counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one open store.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    chunks_allocated: AtomicU64,
    chunks_reused: AtomicU64,
    chunks_freed: AtomicU64,
    chunks_split: AtomicU64,
    chunks_trimmed: AtomicU64,
    chains_grown_in_place: AtomicU64,
    chains_linked: AtomicU64,
    headers_widened: AtomicU64,
    headers_synced: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    transactions_begun: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Allocation

    pub fn increment_chunks_allocated(&self) {
        self.chunks_allocated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunks_reused(&self) {
        self.chunks_reused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_chunks_freed(&self, count: u64) {
        self.chunks_freed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_chunks_split(&self) {
        self.chunks_split.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunks_trimmed(&self) {
        self.chunks_trimmed.fetch_add(1, Ordering::Relaxed);
    }

    // Chains

    pub fn increment_chains_grown_in_place(&self) {
        self.chains_grown_in_place.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chains_linked(&self) {
        self.chains_linked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_headers_widened(&self) {
        self.headers_widened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_headers_synced(&self) {
        self.headers_synced.fetch_add(1, Ordering::Relaxed);
    }

    // Cache

    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    // Payload I/O

    pub fn add_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    // Transactions

    pub fn increment_transactions_begun(&self) {
        self.transactions_begun.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_committed(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_rolled_back(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chunks_allocated: self.chunks_allocated.load(Ordering::Relaxed),
            chunks_reused: self.chunks_reused.load(Ordering::Relaxed),
            chunks_freed: self.chunks_freed.load(Ordering::Relaxed),
            chunks_split: self.chunks_split.load(Ordering::Relaxed),
            chunks_trimmed: self.chunks_trimmed.load(Ordering::Relaxed),
            chains_grown_in_place: self.chains_grown_in_place.load(Ordering::Relaxed),
            chains_linked: self.chains_linked.load(Ordering::Relaxed),
            headers_widened: self.headers_widened.load(Ordering::Relaxed),
            headers_synced: self.headers_synced.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            transactions_begun: self.transactions_begun.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
        }
    }

    /// Snapshot as a JSON object string
    pub fn to_json(&self) -> String {
        // a struct of plain integers always serializes
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub chunks_allocated: u64,
    pub chunks_reused: u64,
    pub chunks_freed: u64,
    pub chunks_split: u64,
    pub chunks_trimmed: u64,
    pub chains_grown_in_place: u64,
    pub chains_linked: u64,
    pub headers_widened: u64,
    pub headers_synced: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub transactions_begun: u64,
    pub transactions_committed: u64,
    pub transactions_rolled_back: u64,
}
