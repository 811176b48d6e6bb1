//! Service metrics.
//!
//! Plain atomic counters exposed through `/stats`. The mean execution
//! time is derived at snapshot time from the total and the completed
//! count.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Request counters for the search service.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Requests received.
    pub requests_total: AtomicU64,
    /// Requests currently in flight.
    pub requests_active: AtomicU64,
    /// Requests that ran to completion.
    pub requests_completed: AtomicU64,
    /// Queries rejected for being below the minimum length.
    pub short_queries: AtomicU64,
    /// Requests cancelled while debouncing.
    pub debounced_cancelled: AtomicU64,
    /// Result cache hits.
    pub cache_hits: AtomicU64,
    /// Result cache misses.
    pub cache_misses: AtomicU64,
    /// Requests cancelled mid-processing by a newer request.
    pub cancelled_during_processing: AtomicU64,
    /// Fuzzy fallback invocations.
    pub fuzzy_invocations: AtomicU64,
    /// Fuzzy fallbacks skipped because the query was too short.
    pub fuzzy_skipped_short: AtomicU64,
    /// Total results returned across requests.
    pub results_returned_total: AtomicU64,
    /// Total execution time across completed requests, in milliseconds.
    pub execution_ms_total: AtomicU64,
}

/// Point-in-time copy of the counters, as serialized into `/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Requests received.
    pub requests_total: u64,
    /// Requests currently in flight.
    pub requests_active: u64,
    /// Requests that ran to completion.
    pub requests_completed: u64,
    /// Queries rejected for being below the minimum length.
    pub short_queries: u64,
    /// Requests cancelled while debouncing.
    pub debounced_cancelled: u64,
    /// Result cache hits.
    pub cache_hits: u64,
    /// Result cache misses.
    pub cache_misses: u64,
    /// Requests cancelled mid-processing by a newer request.
    pub cancelled_during_processing: u64,
    /// Fuzzy fallback invocations.
    pub fuzzy_invocations: u64,
    /// Fuzzy fallbacks skipped because the query was too short.
    pub fuzzy_skipped_short: u64,
    /// Total results returned across requests.
    pub results_returned_total: u64,
    /// Total execution time across completed requests, in milliseconds.
    pub execution_ms_total: u64,
    /// Mean execution time per completed request, in milliseconds.
    pub avg_execution_ms: f64,
}

impl Metrics {
    /// Increment a counter by one.
    pub fn incr(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to a counter.
    pub fn add(&self, counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    /// Decrement the active-request gauge, saturating at zero.
    pub fn decr_active(&self) {
        let _ = self
            .requests_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_sub(1)
            });
    }

    /// Snapshot all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests_completed = self.requests_completed.load(Ordering::Relaxed);
        let execution_ms_total = self.execution_ms_total.load(Ordering::Relaxed);
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_active: self.requests_active.load(Ordering::Relaxed),
            requests_completed,
            short_queries: self.short_queries.load(Ordering::Relaxed),
            debounced_cancelled: self.debounced_cancelled.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cancelled_during_processing: self.cancelled_during_processing.load(Ordering::Relaxed),
            fuzzy_invocations: self.fuzzy_invocations.load(Ordering::Relaxed),
            fuzzy_skipped_short: self.fuzzy_skipped_short.load(Ordering::Relaxed),
            results_returned_total: self.results_returned_total.load(Ordering::Relaxed),
            execution_ms_total,
            avg_execution_ms: if requests_completed > 0 {
                execution_ms_total as f64 / requests_completed as f64
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_derives_mean() {
        let metrics = Metrics::default();
        metrics.incr(&metrics.requests_completed);
        metrics.incr(&metrics.requests_completed);
        metrics.add(&metrics.execution_ms_total, 30);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_completed, 2);
        assert!((snapshot.avg_execution_ms - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn active_gauge_never_underflows() {
        let metrics = Metrics::default();
        metrics.decr_active();
        assert_eq!(metrics.snapshot().requests_active, 0);
    }
}
