//! Domain metrics for seating.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `seating.bookings.total{outcome}` - Booking attempts by outcome
//!   (`confirmed`, `deferred`, or the rejection kind)
//! - `seating.resolutions.total{decision}` - Owner decisions by result
//!   (`granted`, `denied`, `seat_taken`)
//! - `seating.prompts.expired` - Requests withdrawn because the owner never answered
//! - `seating.notifier.failures{operation}` - Failed notifier calls
//!
//! ## Gauges
//! - `seating.channels.active` - Channels with a live store

use metrics::{describe_counter, describe_gauge};

/// Register descriptions for the seating metrics.
///
/// Call once at startup, after the recorder is installed.
pub fn register_seating_metrics() {
    describe_counter!(
        "seating.bookings.total",
        "Booking attempts by outcome (confirmed, deferred, or rejection kind)"
    );
    describe_counter!(
        "seating.resolutions.total",
        "Owner decisions by result (granted, denied, seat_taken)"
    );
    describe_counter!(
        "seating.prompts.expired",
        "Requests withdrawn because the owner never answered"
    );
    describe_counter!(
        "seating.notifier.failures",
        "Failed notifier calls by operation"
    );
    describe_gauge!("seating.channels.active", "Channels with a live store");

    tracing::info!("Seating metrics registered");
}

/// Record a booking attempt.
pub fn record_booking(outcome: &'static str) {
    metrics::counter!("seating.bookings.total", "outcome" => outcome).increment(1);
}

/// Record an owner decision.
pub fn record_resolution(result: &'static str) {
    metrics::counter!("seating.resolutions.total", "decision" => result).increment(1);
}

/// Record a request withdrawn by its prompt timer.
pub fn record_prompt_expired() {
    metrics::counter!("seating.prompts.expired").increment(1);
}

/// Record a failed notifier call.
pub fn record_notifier_failure(operation: &'static str) {
    metrics::counter!("seating.notifier.failures", "operation" => operation).increment(1);
}

/// Record a newly opened channel.
pub fn record_channel_opened() {
    metrics::gauge!("seating.channels.active").increment(1.0);
}

/// Record channels closed by a shutdown.
#[allow(clippy::cast_precision_loss)] // channel counts are small
pub fn record_channels_closed(count: usize) {
    metrics::gauge!("seating.channels.active").decrement(count as f64);
}
