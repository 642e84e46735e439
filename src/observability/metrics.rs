//! Metrics collection.
//!
//! # Responsibilities
//! - Define adapter metrics (requests, latency, failovers, lookups)
//! - Record through the `metrics` facade; exposition is the host's concern
//!
//! # Metrics
//! - `airwatch_requests_total` (counter): exchanges by method, status
//! - `airwatch_request_duration_seconds` (histogram): exchange latency by method
//! - `airwatch_failovers_total` (counter): base URL switches by tenant
//! - `airwatch_failover_exhausted_total` (counter): calls that ran out of base URLs
//! - `airwatch_lookups_total` (counter): identity lookups by kind, outcome
//!
//! # Design Decisions
//! - Transport failures are recorded with status `0`
//! - Labels for method, status code, tenant

use std::time::Instant;

/// Record one completed HTTP exchange.
pub fn record_request(method: &str, status: u16, start_time: Instant) {
    metrics::counter!(
        "airwatch_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "airwatch_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start_time.elapsed().as_secs_f64());
}

/// Record a switch to the next base URL.
pub fn record_failover(tenant: &str) {
    metrics::counter!("airwatch_failovers_total", "tenant" => tenant.to_string()).increment(1);
}

/// Record a call that failed against every base URL.
pub fn record_failover_exhausted(tenant: &str) {
    metrics::counter!("airwatch_failover_exhausted_total", "tenant" => tenant.to_string()).increment(1);
}

/// Record an identity lookup; `outcome` is `found`, `missing` or `error`.
pub fn record_lookup(kind: &'static str, outcome: &'static str) {
    metrics::counter!("airwatch_lookups_total", "kind" => kind, "outcome" => outcome).increment(1);
}
