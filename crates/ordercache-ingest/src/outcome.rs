//! Per-message ingestion outcomes.

use ordercache_core::{OrderError, OrderId};

/// Result of processing one bus message: the id the order was stored and
/// cached under, or the step that failed.
pub type IngestOutcome = Result<OrderId, OrderError>;

/// Short label for an outcome, used in logs and metrics.
#[must_use]
pub fn outcome_kind(outcome: &IngestOutcome) -> &'static str {
    match outcome {
        Ok(_) => "ok",
        Err(OrderError::Decode(_)) => "decode",
        Err(OrderError::Persistence(_)) => "persistence",
        Err(OrderError::IdResolution(_)) => "id_resolution",
        Err(OrderError::Bus(_)) => "bus",
        Err(_) => "other",
    }
}

/// Returns true if the outcome ends the subscription.
#[must_use]
pub fn is_terminal(outcome: &IngestOutcome) -> bool {
    matches!(outcome, Err(OrderError::Bus(_)))
}
