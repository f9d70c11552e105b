//! Prometheus metrics for the order cache.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names for the order cache.
pub mod names {
    /// Lookups answered from memory.
    pub const CACHE_HITS_TOTAL: &str = "ordercache_cache_hits_total";
    /// Lookups that fell through to the store.
    pub const CACHE_MISSES_TOTAL: &str = "ordercache_cache_misses_total";
    /// Current number of cached orders.
    pub const CACHE_ENTRIES: &str = "ordercache_cache_entries";

    /// Completed resync cycles.
    pub const RESYNC_COMPLETED_TOTAL: &str = "ordercache_resync_completed_total";
    /// Resync cycles dropped because ids could not be listed.
    pub const RESYNC_FAILED_TOTAL: &str = "ordercache_resync_failed_total";
    /// Rows skipped during resync.
    pub const RESYNC_ROWS_SKIPPED_TOTAL: &str = "ordercache_resync_rows_skipped_total";
    /// Resync cycle duration in seconds.
    pub const RESYNC_DURATION_SECONDS: &str = "ordercache_resync_duration_seconds";
}

/// Register all cache metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of lookups served from memory");
    describe_counter!(
        names::CACHE_MISSES_TOTAL,
        "Total number of lookups that fell through to the store"
    );
    describe_gauge!(names::CACHE_ENTRIES, "Current number of cached orders");

    describe_counter!(names::RESYNC_COMPLETED_TOTAL, "Total number of completed resync cycles");
    describe_counter!(
        names::RESYNC_FAILED_TOTAL,
        "Total number of resync cycles dropped before the swap"
    );
    describe_counter!(
        names::RESYNC_ROWS_SKIPPED_TOTAL,
        "Total number of rows skipped during resync"
    );
    describe_histogram!(names::RESYNC_DURATION_SECONDS, "Resync cycle duration in seconds");
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a lookup served from memory.
    pub fn hit() {
        counter!(names::CACHE_HITS_TOTAL).increment(1);
    }

    /// Record a lookup that went to the store.
    pub fn miss(outcome: &'static str) {
        counter!(names::CACHE_MISSES_TOTAL, "outcome" => outcome).increment(1);
    }

    /// Record the current entry count.
    #[allow(clippy::cast_precision_loss)]
    pub fn entries(count: usize) {
        gauge!(names::CACHE_ENTRIES).set(count as f64);
    }

    /// Record a completed resync.
    pub fn resync_completed(skipped: usize, duration: Duration) {
        counter!(names::RESYNC_COMPLETED_TOTAL).increment(1);
        counter!(names::RESYNC_ROWS_SKIPPED_TOTAL).increment(skipped as u64);
        histogram!(names::RESYNC_DURATION_SECONDS, "status" => "completed")
            .record(duration.as_secs_f64());
    }

    /// Record a resync dropped before the swap.
    pub fn resync_failed(duration: Duration) {
        counter!(names::RESYNC_FAILED_TOTAL).increment(1);
        histogram!(names::RESYNC_DURATION_SECONDS, "status" => "failed")
            .record(duration.as_secs_f64());
    }
}
