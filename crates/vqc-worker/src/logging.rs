//! Tracing setup and per-delivery job logging.

use std::time::Duration;

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vqc_models::{Job, JobId, JobOutcome};
use vqc_queue::QueueMessage;

use crate::error::WorkerError;

/// Install the global tracing subscriber.
///
/// Colored human-readable output by default, JSON when `LOG_FORMAT=json`.
/// `RUST_LOG` overrides the default of `info` for this workspace's crates
/// and `warn` for dependencies.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,vqc=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Logger for one delivery of a job message.
///
/// Every event carries the job ID, the queue message ID and the receive
/// count, so redeliveries of the same job can be told apart.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    message_id: String,
    receive_count: Option<u32>,
}

impl JobLogger {
    pub fn new(job_id: &JobId, message: &QueueMessage) -> Self {
        Self {
            job_id: job_id.to_string(),
            message_id: message.message_id.clone(),
            receive_count: message.receive_count,
        }
    }

    /// Span wrapping all work done for this delivery.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            message_id = %self.message_id,
            receive_count = self.receive_count.unwrap_or(0)
        )
    }

    fn is_redelivery(&self) -> bool {
        self.receive_count.map(|n| n > 1).unwrap_or(false)
    }

    /// Log that the message was picked up. Redeliveries are warnings.
    pub fn log_delivery(&self) {
        if self.is_redelivery() {
            warn!(
                job_id = %self.job_id,
                receive_count = self.receive_count.unwrap_or(0),
                "Job redelivered, a previous attempt did not finish"
            );
        } else {
            info!(job_id = %self.job_id, "Job received");
        }
    }

    pub fn log_not_claimable(&self, status: Option<&str>) {
        info!(
            job_id = %self.job_id,
            status = status.unwrap_or("unknown"),
            "Job not claimable, skipping"
        );
    }

    pub fn log_claimed(&self, job: &Job) {
        info!(
            job_id = %self.job_id,
            checks = ?job.requested,
            source = %job.source,
            size_bytes = ?job.file_size_bytes,
            "Job claimed"
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, "Job progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, "Job warning: {}", message);
    }

    pub fn log_failure(&self, err: &WorkerError) {
        error!(
            job_id = %self.job_id,
            kind = err.kind(),
            receive_count = self.receive_count.unwrap_or(0),
            "Job failed: {}", err
        );
    }

    /// Log the terminal outcome of this delivery.
    pub fn log_outcome(&self, outcome: JobOutcome, elapsed: Duration) {
        info!(
            job_id = %self.job_id,
            outcome = %outcome,
            acknowledged = outcome.should_acknowledge(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Job finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(receive_count: Option<u32>) -> QueueMessage {
        QueueMessage {
            message_id: "m-7".into(),
            receipt_handle: "rh-7".into(),
            body: r#"{"jobId":"job-123"}"#.into(),
            receive_count,
        }
    }

    #[test]
    fn test_job_logger_tracks_delivery() {
        let job_id = JobId::from_string("job-123");
        let logger = JobLogger::new(&job_id, &delivery(Some(3)));

        assert_eq!(logger.job_id, "job-123");
        assert_eq!(logger.message_id, "m-7");
        assert_eq!(logger.receive_count, Some(3));
        assert!(logger.is_redelivery());
    }

    #[test]
    fn test_first_delivery_is_not_redelivery() {
        let job_id = JobId::from_string("job-123");
        assert!(!JobLogger::new(&job_id, &delivery(Some(1))).is_redelivery());
        assert!(!JobLogger::new(&job_id, &delivery(None)).is_redelivery());
    }
}
