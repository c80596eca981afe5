use std::net::SocketAddr;

use crate::wire::Request;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total wire requests handled. Labels: op, status.
pub const REQUESTS_TOTAL: &str = "drivesched_requests_total";

/// Histogram: wire request latency in seconds. Labels: op.
pub const REQUEST_DURATION_SECONDS: &str = "drivesched_request_duration_seconds";

/// Counter: validations by outcome. Labels: verdict, reason.
pub const VALIDATIONS_TOTAL: &str = "drivesched_validations_total";

/// Histogram: end-to-end validation latency in seconds.
pub const VALIDATION_DURATION_SECONDS: &str = "drivesched_validation_duration_seconds";

/// Counter: availability writes issued by reconciliation. Labels: action, status.
pub const RECONCILE_OPS_TOTAL: &str = "drivesched_reconcile_ops_total";

/// Counter: failed calls to the backing store. Labels: stage.
pub const PROVIDER_ERRORS_TOTAL: &str = "drivesched_provider_errors_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "drivesched_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "drivesched_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "drivesched_connections_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Request variant to a short label for metrics.
pub fn op_label(req: &Request) -> &'static str {
    match req {
        Request::Validate { .. } => "validate",
        Request::ReconcileAvailability { .. } => "reconcile_availability",
        Request::ListAvailability { .. } => "list_availability",
        Request::PutBooking { .. } => "put_booking",
        Request::DeleteBooking { .. } => "delete_booking",
        Request::PutResource { .. } => "put_resource",
        Request::PutInstructor { .. } => "put_instructor",
        Request::PutCourse { .. } => "put_course",
        Request::PutEnrollment { .. } => "put_enrollment",
    }
}
