//! Process-wide driver counters.
//!
//! The driver bumps these as it works and logs them once per run through
//! [`Metrics::flush`]. Values are cumulative across runs.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every driver in the process.
pub static METRICS: Metrics = Metrics::new();

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub items_processed: u64,
    pub analyses_attempted: u64,
    pub retries: u64,
    pub outputs_forwarded: u64,
}

/// Lock-free counters updated by the driver.
pub struct Metrics {
    items_processed: AtomicU64,
    analyses_attempted: AtomicU64,
    retries: AtomicU64,
    outputs_forwarded: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            items_processed: AtomicU64::new(0),
            analyses_attempted: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            outputs_forwarded: AtomicU64::new(0),
        }
    }

    /// Count one compilation pulled from the queue.
    pub fn inc_items(&self) {
        self.items_processed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "items_processed", "counter incremented");
    }

    /// Count one call to the analyzer, retries included.
    pub fn inc_analyses(&self) {
        self.analyses_attempted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "analyses_attempted", "counter incremented");
    }

    /// Count one retry, whether the analyzer or the error hook asked for it.
    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "retries", "counter incremented");
    }

    /// Count one output passed to the output sink.
    pub fn inc_outputs(&self) {
        self.outputs_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter at once, e.g. for export.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_processed: self.items_processed(),
            analyses_attempted: self.analyses_attempted(),
            retries: self.retries(),
            outputs_forwarded: self.outputs_forwarded(),
        }
    }

    /// Log the current values as one `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            items_processed = self.items_processed(),
            analyses_attempted = self.analyses_attempted(),
            retries = self.retries(),
            outputs_forwarded = self.outputs_forwarded(),
        );
    }

    /// Current value of the items-processed counter.
    pub fn items_processed(&self) -> u64 {
        self.items_processed.load(Ordering::Relaxed)
    }

    /// Current value of the analyses-attempted counter.
    pub fn analyses_attempted(&self) -> u64 {
        self.analyses_attempted.load(Ordering::Relaxed)
    }

    /// Current value of the retries counter.
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Current value of the outputs-forwarded counter.
    pub fn outputs_forwarded(&self) -> u64 {
        self.outputs_forwarded.load(Ordering::Relaxed)
    }
}
