//! Statistics for plumbing instances
//!
//! Counters are updated with relaxed atomics.
//! They are for display only and may briefly disagree with the registry.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live counters owned by a registry
#[derive(Debug, Default)]
pub struct PlumbingCounters {
    inlets: AtomicUsize,
    outlets: AtomicUsize,
    chunks_broadcast: AtomicU64,
    bytes_broadcast: AtomicU64,
    source_errors: AtomicU64,
}

impl PlumbingCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inlet_added(&self) {
        self.inlets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inlet_removed(&self) {
        self.inlets.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn outlet_added(&self) {
        self.outlets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn outlet_removed(&self) {
        self.outlets.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_chunk(&self, size: usize) {
        self.chunks_broadcast.fetch_add(1, Ordering::Relaxed);
        self.bytes_broadcast.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_source_error(&self) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot
    pub fn snapshot(&self) -> PlumbingStats {
        PlumbingStats {
            inlet_count: self.inlets.load(Ordering::Relaxed),
            outlet_count: self.outlets.load(Ordering::Relaxed),
            chunks_broadcast: self.chunks_broadcast.load(Ordering::Relaxed),
            bytes_broadcast: self.bytes_broadcast.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time plumbing statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlumbingStats {
    /// Registered inlets
    pub inlet_count: usize,
    /// Registered outlets
    pub outlet_count: usize,
    /// Chunks handed to the broadcast step
    pub chunks_broadcast: u64,
    /// Bytes handed to the broadcast step
    pub bytes_broadcast: u64,
    /// Pull-inlet sources that ended with a read error instead of a clean end-of-stream
    pub source_errors: u64,
}

impl PlumbingStats {
    /// Average chunk size in bytes
    pub fn average_chunk_size(&self) -> u64 {
        if self.chunks_broadcast > 0 {
            self.bytes_broadcast / self.chunks_broadcast
        } else {
            0
        }
    }
}
