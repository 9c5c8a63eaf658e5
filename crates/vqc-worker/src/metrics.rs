//! Worker metrics.
//!
//! Job outcome counters, job latency and queue error counters. Tool
//! latency is recorded by `vqc-media` itself.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use vqc_models::JobOutcome;

/// Metric name constants for consistency.
pub mod names {
    /// Handled queue messages by outcome.
    pub const JOBS_TOTAL: &str = "vqc_jobs_total";

    /// Wall time per handled message in seconds.
    pub const JOB_DURATION_SECONDS: &str = "vqc_job_duration_seconds";

    /// Queue receive/delete failures by operation.
    pub const QUEUE_ERRORS_TOTAL: &str = "vqc_queue_errors_total";
}

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Record the outcome of one handled message.
pub fn record_job(outcome: JobOutcome, elapsed: Duration) {
    counter!(names::JOBS_TOTAL, "outcome" => outcome.as_str()).increment(1);

    if outcome.did_work() {
        histogram!(names::JOB_DURATION_SECONDS, "outcome" => outcome.as_str())
            .record(elapsed.as_secs_f64());
    }
}

/// Record a queue operation failure.
pub fn record_queue_error(operation: &'static str) {
    counter!(names::QUEUE_ERRORS_TOTAL, "operation" => operation).increment(1);
}
