//! Metric name constants.
//!
//! Centralised metric names for the metering pipeline itself. Consumers
//! install their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! These describe the health of metering (how many records were built, how
//! many deliveries succeeded). The usage records themselves go to the
//! metering endpoint, not here.
//!
//! # Common labels
//!
//! - `operation`: operation kind: "chat", "stream" or "embed"
//! - `status`: delivery outcome: "ok", "rejected" or "failed"

/// Total telemetry records built.
///
/// Labels: `operation`.
pub const RECORDS_TOTAL: &str = "genai_meter_records_total";

/// Total delivery attempts to the metering endpoint.
///
/// Labels: `status` ("ok" | "rejected" | "failed").
pub const DELIVERIES_TOTAL: &str = "genai_meter_deliveries_total";

/// Delivery round-trip duration in seconds.
pub const DELIVERY_DURATION_SECONDS: &str = "genai_meter_delivery_duration_seconds";

/// Total detached telemetry tasks that panicked.
pub const TASK_PANICS_TOTAL: &str = "genai_meter_task_panics_total";
