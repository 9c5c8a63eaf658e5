//! Job queue using AWS SQS.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use aws_types::SdkConfig;
use tracing::{debug, warn};

use crate::error::{QueueError, QueueResult};
use crate::message::QueueMessage;

/// SQS caps long-poll waits at 20 seconds.
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// SQS queue URL
    pub queue_url: String,
    /// Long-poll wait per receive
    pub wait_time: Duration,
}

impl QueueConfig {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            wait_time: MAX_WAIT_TIME,
        }
    }

    /// Set the long-poll wait, clamped to the SQS maximum.
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time.min(MAX_WAIT_TIME);
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        let queue_url = std::env::var("SQS_QUEUE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| QueueError::config_error("SQS_QUEUE_URL is not set"))?;

        let wait_time = Duration::from_secs(
            std::env::var("QUEUE_WAIT_TIME_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
        );

        Ok(Self::new(queue_url).with_wait_time(wait_time))
    }
}

/// Queue seam used by the dispatcher.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Long-poll for at most one message. `None` when the wait elapsed empty.
    async fn receive(&self) -> QueueResult<Option<QueueMessage>>;

    /// Acknowledge a message so it is not redelivered.
    async fn delete(&self, receipt_handle: &str) -> QueueResult<()>;
}

/// SQS-backed job queue.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    config: QueueConfig,
}

impl SqsQueue {
    /// Create a new queue client from the shared SDK config.
    pub fn new(sdk_config: &SdkConfig, config: QueueConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            config,
        }
    }
}

#[async_trait]
impl JobQueue for SqsQueue {
    async fn receive(&self) -> QueueResult<Option<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.config.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(self.config.wait_time.as_secs() as i32)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| QueueError::receive_failed(DisplayErrorContext(&e).to_string()))?;

        let Some(message) = output.messages.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };

        let message = into_queue_message(message)?;
        debug!(
            message_id = %message.message_id,
            receive_count = ?message.receive_count,
            "Received queue message"
        );
        Ok(Some(message))
    }

    async fn delete(&self, receipt_handle: &str) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.config.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::delete_failed(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

fn into_queue_message(message: Message) -> QueueResult<QueueMessage> {
    let receive_count = message
        .attributes
        .as_ref()
        .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|count| count.parse().ok());

    let receipt_handle = message
        .receipt_handle
        .ok_or_else(|| QueueError::receive_failed("message has no receipt handle"))?;

    let message_id = message.message_id.unwrap_or_default();
    let body = message.body.unwrap_or_else(|| {
        warn!(message_id = %message_id, "Queue message has no body");
        String::new()
    });

    Ok(QueueMessage {
        message_id,
        receipt_handle,
        body,
        receive_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_time_is_clamped() {
        let config = QueueConfig::new("https://sqs.eu-central-1.amazonaws.com/1/jobs")
            .with_wait_time(Duration::from_secs(60));
        assert_eq!(config.wait_time, MAX_WAIT_TIME);

        let config = config.with_wait_time(Duration::from_secs(5));
        assert_eq!(config.wait_time, Duration::from_secs(5));
    }

    #[test]
    fn test_into_queue_message() {
        let message = Message::builder()
            .message_id("m-1")
            .receipt_handle("rh-1")
            .body(r#"{"jobId":"job-1"}"#)
            .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "2")
            .build();

        let message = into_queue_message(message).unwrap();
        assert_eq!(message.receipt_handle, "rh-1");
        assert_eq!(message.receive_count, Some(2));
        assert!(message.is_redelivery());
    }

    #[test]
    fn test_message_without_receipt_handle_is_rejected() {
        let message = Message::builder().message_id("m-1").body("{}").build();
        assert!(matches!(
            into_queue_message(message),
            Err(QueueError::ReceiveFailed(_))
        ));
    }
}
