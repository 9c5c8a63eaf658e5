//! SQS job queue consumer.
//!
//! This crate provides:
//! - The `JobQueue` seam (receive one message, delete by receipt handle)
//! - An SQS implementation with long polling
//! - Job message decoding

pub mod error;
pub mod message;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use message::{JobMessage, QueueMessage};
pub use queue::{JobQueue, QueueConfig, SqsQueue, MAX_WAIT_TIME};
