//! Queue-driven dispatcher.
//!
//! Receives one message at a time, drives the job to a terminal outcome and
//! decides whether the message is acknowledged. Failed jobs are left in the
//! queue; redelivery and dead-lettering belong to the queue.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{error, info, warn, Instrument};

use vqc_models::JobOutcome;
use vqc_queue::{JobQueue, QueueMessage};

use crate::logging::JobLogger;
use crate::metrics::{record_job, record_queue_error};
use crate::processor::{process_job, WorkerContext};

/// Single-consumer dispatch loop.
pub struct Dispatcher {
    queue: Arc<dyn JobQueue>,
    ctx: Arc<WorkerContext>,
    shutdown: watch::Sender<bool>,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn JobQueue>, ctx: Arc<WorkerContext>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            queue,
            ctx,
            shutdown,
        }
    }

    /// Run until [`Dispatcher::shutdown`] is called.
    ///
    /// A message already being handled is finished first. Receive errors
    /// are logged and followed by the failure pause; they never end the loop.
    pub async fn run(&self) {
        info!(
            "Starting dispatcher (failure pause {:?})",
            self.ctx.config.failure_pause
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let received = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                received = self.queue.receive() => received,
            };

            match received {
                Ok(None) => {}
                Ok(Some(message)) => {
                    if self.handle_message(message).await == JobOutcome::Failed {
                        self.pause(&mut shutdown_rx).await;
                    }
                }
                Err(e) => {
                    error!("Queue receive failed: {}", e);
                    record_queue_error(e.operation());
                    self.pause(&mut shutdown_rx).await;
                }
            }
        }

        info!("Dispatcher stopped");
    }

    /// Signal shutdown. Takes effect even if `run` has not started yet.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Handle one received message to a terminal outcome.
    pub async fn handle_message(&self, message: QueueMessage) -> JobOutcome {
        let started = Instant::now();

        let job_message = match message.decode() {
            Ok(job_message) => job_message,
            Err(e) => {
                warn!(
                    message_id = %message.message_id,
                    "Discarding malformed queue message: {}", e
                );
                self.acknowledge(&message).await;
                record_job(JobOutcome::MalformedMessage, started.elapsed());
                return JobOutcome::MalformedMessage;
            }
        };

        let job_id = job_message.job_id;
        let logger = JobLogger::new(&job_id, &message);

        let outcome = async {
            logger.log_delivery();

            let outcome = match process_job(&self.ctx, &job_id, &logger).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    logger.log_failure(&e);
                    self.ctx.control.fail(&job_id, &e.to_string()).await;
                    JobOutcome::Failed
                }
            };

            if outcome.should_acknowledge() {
                self.acknowledge(&message).await;
            }
            logger.log_outcome(outcome, started.elapsed());
            outcome
        }
        .instrument(logger.span())
        .await;

        record_job(outcome, started.elapsed());
        outcome
    }

    async fn acknowledge(&self, message: &QueueMessage) {
        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            warn!(
                message_id = %message.message_id,
                "Failed to delete queue message: {}", e
            );
            record_queue_error(e.operation());
        }
    }

    async fn pause(&self, shutdown_rx: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(self.ctx.config.failure_pause) => {}
            _ = shutdown_rx.changed() => {}
        }
    }
}
