//! Video quality-check worker.
//!
//! This crate provides:
//! - The queue-driven dispatcher and its acknowledgement policy
//! - Per-job processing (claim, download, analyze, report)
//! - Worker configuration, logging and metrics

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod processor;

pub use config::WorkerConfig;
pub use dispatcher::Dispatcher;
pub use error::{WorkerError, WorkerResult};
pub use logging::{init_tracing, JobLogger};
pub use processor::{process_job, WorkerContext};
