/// Metrics and telemetry for the reporting backend
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Report submissions and decisions
/// - Account registrations and approval decisions
/// - Background job execution
/// - Process uptime

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, Gauge, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Workflow Metrics ==========

    /// Session reports submitted by hosts
    pub static ref REPORTS_SUBMITTED_TOTAL: IntCounter = register_int_counter!(
        "reports_submitted_total",
        "Total number of session reports submitted"
    )
    .unwrap();

    /// Report decisions by resulting status
    pub static ref REPORT_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "report_decisions_total",
        "Total number of report verify/reject decisions",
        &["status"]
    )
    .unwrap();

    /// Bot self-registrations
    pub static ref REGISTRATIONS_TOTAL: IntCounter = register_int_counter!(
        "registrations_total",
        "Total number of pending account registrations"
    )
    .unwrap();

    /// Approval decisions by outcome
    pub static ref APPROVAL_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "approval_decisions_total",
        "Total number of account approval decisions",
        &["outcome"]
    )
    .unwrap();

    /// Replayed idempotent responses
    pub static ref IDEMPOTENT_REPLAYS_TOTAL: IntCounter = register_int_counter!(
        "idempotent_replays_total",
        "Total number of responses replayed for a repeated Idempotency-Key"
    )
    .unwrap();

    // ========== Background Jobs ==========

    /// Background job executions
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();

    // ========== Errors ==========

    /// Error responses by error code
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "errors_total",
        "Total number of error responses",
        &["error_type"]
    )
    .unwrap();

    // ========== System Metrics ==========

    static ref STARTED_AT: Instant = Instant::now();

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Mark process start; uptime is measured from the first call
pub fn init_uptime() {
    lazy_static::initialize(&STARTED_AT);
}

/// Refresh and return the uptime gauge
pub fn update_uptime() -> f64 {
    let uptime = STARTED_AT.elapsed().as_secs_f64();
    UPTIME_SECONDS.set(uptime);
    uptime
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    update_uptime();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a report submission
pub fn record_report_submitted() {
    REPORTS_SUBMITTED_TOTAL.inc();
}

/// Record a report decision
pub fn record_report_decision(status: &str) {
    REPORT_DECISIONS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a pending registration
pub fn record_registration() {
    REGISTRATIONS_TOTAL.inc();
}

/// Record an approval decision
pub fn record_approval_decision(outcome: &str) {
    APPROVAL_DECISIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a replayed idempotent response
pub fn record_idempotent_replay() {
    IDEMPOTENT_REPLAYS_TOTAL.inc();
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

/// Record an error response
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}
