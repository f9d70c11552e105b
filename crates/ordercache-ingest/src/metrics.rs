//! Prometheus metrics for the ingestion pipeline.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names for the ingestion pipeline.
pub mod names {
    /// Messages taken off the bus.
    pub const EVENTS_RECEIVED_TOTAL: &str = "ordercache_ingest_events_received_total";
    /// Messages processed, labelled by outcome.
    pub const EVENTS_PROCESSED_TOTAL: &str = "ordercache_ingest_events_processed_total";
    /// Time from receipt to outcome, in seconds.
    pub const PROCESSING_DURATION_SECONDS: &str = "ordercache_ingest_processing_duration_seconds";
}

/// Register all ingestion metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::EVENTS_RECEIVED_TOTAL, "Total number of order events received");
    describe_counter!(
        names::EVENTS_PROCESSED_TOTAL,
        "Total number of order events processed, by outcome"
    );
    describe_histogram!(
        names::PROCESSING_DURATION_SECONDS,
        "Order event processing duration in seconds"
    );
}

/// Ingestion metrics recorder.
#[derive(Clone)]
pub struct IngestMetrics;

impl IngestMetrics {
    /// Record a message received.
    pub fn received(subject: &str) {
        counter!(names::EVENTS_RECEIVED_TOTAL, "subject" => subject.to_string()).increment(1);
    }

    /// Record a processed message.
    pub fn processed(outcome: &'static str, duration: Duration) {
        counter!(names::EVENTS_PROCESSED_TOTAL, "outcome" => outcome).increment(1);
        histogram!(names::PROCESSING_DURATION_SECONDS, "outcome" => outcome)
            .record(duration.as_secs_f64());
    }
}
