// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from
//! the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured error metrics sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured HTTP boundary metrics sink.
pub fn http_metrics() -> &'static dyn HttpMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured ledger/signing metrics sink.
pub fn ledger_metrics() -> &'static dyn LedgerMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured mail-queue metrics sink.
pub fn mail_metrics() -> &'static dyn MailMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// Metrics for the `/api/v1` HTTP boundary (§6).
pub trait HttpMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of a request, labeled by route and method.
    fn observe_request_duration(&self, route: &str, method: &str, duration_secs: f64);
    /// Increments total requests, labeled by route, method, and status code.
    fn inc_requests_total(&self, route: &str, method: &str, status_code: u16);
    /// Increments a counter for requests rejected by a rate limiter.
    fn inc_rate_limited(&self, surface: &str);
}
impl HttpMetricsSink for NopSink {
    fn observe_request_duration(&self, _route: &str, _method: &str, _duration_secs: f64) {}
    fn inc_requests_total(&self, _route: &str, _method: &str, _status_code: u16) {}
    fn inc_rate_limited(&self, _surface: &str) {}
}

/// Metrics for the ledger store and signing engine (C2/C3, §4.2-§4.3).
pub trait LedgerMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for attestations successfully appended.
    fn inc_attestations_created(&self);
    /// Increments the counter for `ALREADY_SIGNED` rejections.
    fn inc_already_signed(&self);
    /// Increments the counter for a `CHAIN_CONFLICT` retry attempt.
    fn inc_chain_conflict_retry(&self);
    /// Increments the counter for retries exhausted (`TRANSIENT`).
    fn inc_transient_failure(&self);
    /// Observes the latency of a `create` call, end to end.
    fn observe_create_duration(&self, duration_secs: f64);
}
impl LedgerMetricsSink for NopSink {
    fn inc_attestations_created(&self) {}
    fn inc_already_signed(&self) {}
    fn inc_chain_conflict_retry(&self) {}
    fn inc_transient_failure(&self) {}
    fn observe_create_duration(&self, _duration_secs: f64) {}
}

/// Metrics for the email queue and dispatcher (C7, §4.7).
pub trait MailMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for jobs transitioning to a terminal status.
    fn inc_jobs_terminal(&self, status: &str);
    /// Increments a counter for a retry scheduled after a transient failure.
    fn inc_job_retry_scheduled(&self);
    /// Sets the gauge for the current number of pending jobs.
    fn set_queue_depth(&self, depth: i64);
    /// Observes the latency of one dispatch attempt.
    fn observe_dispatch_duration(&self, duration_secs: f64);
}
impl MailMetricsSink for NopSink {
    fn inc_jobs_terminal(&self, _status: &str) {}
    fn inc_job_retry_scheduled(&self) {}
    fn set_queue_depth(&self, _depth: i64) {}
    fn observe_dispatch_duration(&self, _duration_secs: f64) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its code.
    fn inc_error(&self, code: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _code: &'static str) {}
}

/// A unified sink implementing all domain-specific traits, providing a
/// single point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    HttpMetricsSink + LedgerMetricsSink + MailMetricsSink + ErrorMetricsSink
{
}

impl<T> MetricsSink for T where
    T: HttpMetricsSink + LedgerMetricsSink + MailMetricsSink + ErrorMetricsSink
{
}
