// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter_vec,
    register_int_gauge, HistogramVec, IntCounterVec, IntGauge,
};

// --- Metric Statics ---
// We use OnceCell to hold the metric collectors. They will be initialized
// exactly once by the `install` function.

static HTTP_REQUESTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static HTTP_REQUEST_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static HTTP_RATE_LIMITED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static LEDGER_ATTESTATIONS_CREATED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static LEDGER_ALREADY_SIGNED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static LEDGER_CHAIN_CONFLICT_RETRY_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static LEDGER_TRANSIENT_FAILURE_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static LEDGER_CREATE_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();

static MAIL_JOBS_TERMINAL_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static MAIL_JOB_RETRY_SCHEDULED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static MAIL_QUEUE_DEPTH: OnceCell<IntGauge> = OnceCell::new();
static MAIL_DISPATCH_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();

static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Helper macro to reduce boilerplate for getting a metric from OnceCell.
/// This will panic if `install()` has not been called, which is intentional
/// as it indicates a critical application setup error.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("Prometheus sink not initialized. Call telemetry::prometheus::install() first.")
    };
}

impl HttpMetricsSink for PrometheusSink {
    fn observe_request_duration(&self, route: &str, method: &str, duration_secs: f64) {
        get_metric!(HTTP_REQUEST_DURATION_SECONDS)
            .with_label_values(&[route, method])
            .observe(duration_secs);
    }
    fn inc_requests_total(&self, route: &str, method: &str, status_code: u16) {
        get_metric!(HTTP_REQUESTS_TOTAL)
            .with_label_values(&[route, method, &status_code.to_string()])
            .inc();
    }
    fn inc_rate_limited(&self, surface: &str) {
        get_metric!(HTTP_RATE_LIMITED_TOTAL)
            .with_label_values(&[surface])
            .inc();
    }
}

impl LedgerMetricsSink for PrometheusSink {
    fn inc_attestations_created(&self) {
        get_metric!(LEDGER_ATTESTATIONS_CREATED_TOTAL)
            .with_label_values(&[])
            .inc();
    }
    fn inc_already_signed(&self) {
        get_metric!(LEDGER_ALREADY_SIGNED_TOTAL)
            .with_label_values(&[])
            .inc();
    }
    fn inc_chain_conflict_retry(&self) {
        get_metric!(LEDGER_CHAIN_CONFLICT_RETRY_TOTAL)
            .with_label_values(&[])
            .inc();
    }
    fn inc_transient_failure(&self) {
        get_metric!(LEDGER_TRANSIENT_FAILURE_TOTAL)
            .with_label_values(&[])
            .inc();
    }
    fn observe_create_duration(&self, duration_secs: f64) {
        get_metric!(LEDGER_CREATE_DURATION_SECONDS)
            .with_label_values(&[])
            .observe(duration_secs);
    }
}

impl MailMetricsSink for PrometheusSink {
    fn inc_jobs_terminal(&self, status: &str) {
        get_metric!(MAIL_JOBS_TERMINAL_TOTAL)
            .with_label_values(&[status])
            .inc();
    }
    fn inc_job_retry_scheduled(&self) {
        get_metric!(MAIL_JOB_RETRY_SCHEDULED_TOTAL)
            .with_label_values(&[])
            .inc();
    }
    fn set_queue_depth(&self, depth: i64) {
        get_metric!(MAIL_QUEUE_DEPTH).set(depth);
    }
    fn observe_dispatch_duration(&self, duration_secs: f64) {
        get_metric!(MAIL_DISPATCH_DURATION_SECONDS)
            .with_label_values(&[])
            .observe(duration_secs);
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, code: &'static str) {
        get_metric!(ERRORS_TOTAL).with_label_values(&[code]).inc();
    }
}

/// Initializes all Prometheus metrics collectors and returns a static reference to the sink.
/// This function must be called only once at application startup.
#[allow(clippy::expect_used)]
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    HTTP_REQUESTS_TOTAL
        .set(register_int_counter_vec!(
            "ackify_http_requests_total",
            "Total HTTP requests handled, by route, method, and status code.",
            &["route", "method", "status"]
        )?)
        .expect("static already initialized");
    HTTP_REQUEST_DURATION_SECONDS
        .set(register_histogram_vec!(
            "ackify_http_request_duration_seconds",
            "Latency of HTTP requests, by route and method.",
            &["route", "method"],
            exponential_buckets(0.001, 2.0, 15)?
        )?)
        .expect("static already initialized");
    HTTP_RATE_LIMITED_TOTAL
        .set(register_int_counter_vec!(
            "ackify_http_rate_limited_total",
            "Total requests rejected by a rate limiter, by surface.",
            &["surface"]
        )?)
        .expect("static already initialized");
    LEDGER_ATTESTATIONS_CREATED_TOTAL
        .set(register_int_counter_vec!(
            "ackify_ledger_attestations_created_total",
            "Total attestations successfully appended to the ledger.",
            &[] as &[&str]
        )?)
        .expect("static already initialized");
    LEDGER_ALREADY_SIGNED_TOTAL
        .set(register_int_counter_vec!(
            "ackify_ledger_already_signed_total",
            "Total sign attempts rejected because the user already signed the document.",
            &[] as &[&str]
        )?)
        .expect("static already initialized");
    LEDGER_CHAIN_CONFLICT_RETRY_TOTAL
        .set(register_int_counter_vec!(
            "ackify_ledger_chain_conflict_retry_total",
            "Total retries triggered by a concurrent chain-tail conflict.",
            &[] as &[&str]
        )?)
        .expect("static already initialized");
    LEDGER_TRANSIENT_FAILURE_TOTAL
        .set(register_int_counter_vec!(
            "ackify_ledger_transient_failure_total",
            "Total sign attempts that exhausted their chain-conflict retry budget.",
            &[] as &[&str]
        )?)
        .expect("static already initialized");
    LEDGER_CREATE_DURATION_SECONDS
        .set(register_histogram_vec!(
            "ackify_ledger_create_duration_seconds",
            "End-to-end latency of the attestation creation path.",
            &[] as &[&str],
            exponential_buckets(0.001, 2.0, 15)?
        )?)
        .expect("static already initialized");
    MAIL_JOBS_TERMINAL_TOTAL
        .set(register_int_counter_vec!(
            "ackify_mail_jobs_terminal_total",
            "Total email jobs reaching a terminal status, by status.",
            &["status"]
        )?)
        .expect("static already initialized");
    MAIL_JOB_RETRY_SCHEDULED_TOTAL
        .set(register_int_counter_vec!(
            "ackify_mail_job_retry_scheduled_total",
            "Total email jobs rescheduled for retry after a transient dispatch failure.",
            &[] as &[&str]
        )?)
        .expect("static already initialized");
    MAIL_QUEUE_DEPTH
        .set(register_int_gauge!(
            "ackify_mail_queue_depth",
            "Current number of pending email jobs."
        )?)
        .expect("static already initialized");
    MAIL_DISPATCH_DURATION_SECONDS
        .set(register_histogram_vec!(
            "ackify_mail_dispatch_duration_seconds",
            "Latency of a single email dispatch attempt.",
            &[] as &[&str],
            exponential_buckets(0.01, 2.0, 12)?
        )?)
        .expect("static already initialized");
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "ackify_errors_total",
            "Total number of errors returned to callers, categorized by error code.",
            &["code"]
        )?)
        .expect("static already initialized");

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
