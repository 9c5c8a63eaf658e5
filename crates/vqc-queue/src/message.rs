//! Queue message types.

use serde::Deserialize;

use vqc_models::JobId;

use crate::error::{QueueError, QueueResult};

/// A message received from the queue, not yet decoded.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Queue-assigned message ID
    pub message_id: String,
    /// Handle used to delete (acknowledge) the message
    pub receipt_handle: String,
    /// Raw body
    pub body: String,
    /// How many times the queue has delivered this message
    pub receive_count: Option<u32>,
}

impl QueueMessage {
    /// Decode the body into a job message.
    pub fn decode(&self) -> QueueResult<JobMessage> {
        JobMessage::decode(&self.body)
    }

    /// Whether this is a redelivery.
    pub fn is_redelivery(&self) -> bool {
        self.receive_count.map(|n| n > 1).unwrap_or(false)
    }
}

/// Decoded message body: `{"jobId": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    pub job_id: JobId,
}

impl JobMessage {
    /// Parse a message body. The body must be a JSON object whose `jobId`
    /// is a non-empty string; other fields are ignored.
    pub fn decode(body: &str) -> QueueResult<Self> {
        if body.trim().is_empty() {
            return Err(QueueError::malformed("empty body"));
        }

        let message: Self = serde_json::from_str(body)?;
        if message.job_id.as_str().trim().is_empty() {
            return Err(QueueError::malformed("jobId is empty"));
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_job_message() {
        let message = JobMessage::decode(r#"{"jobId":"job-42","trace":"abc"}"#).unwrap();
        assert_eq!(message.job_id.as_str(), "job-42");
    }

    #[test]
    fn test_decode_rejects_malformed_bodies() {
        for body in [
            "",
            "not json",
            "[]",
            r#""job-42""#,
            r#"{}"#,
            r#"{"jobId":42}"#,
            r#"{"jobId":null}"#,
            r#"{"jobId":""}"#,
            r#"{"jobId":"   "}"#,
            r#"{"job_id":"job-42"}"#,
        ] {
            assert!(JobMessage::decode(body).is_err(), "accepted {:?}", body);
        }
    }

    #[test]
    fn test_redelivery() {
        let mut message = QueueMessage {
            message_id: "m-1".into(),
            receipt_handle: "rh-1".into(),
            body: r#"{"jobId":"job-1"}"#.into(),
            receive_count: Some(1),
        };
        assert!(!message.is_redelivery());
        message.receive_count = Some(3);
        assert!(message.is_redelivery());
        assert_eq!(message.decode().unwrap().job_id.as_str(), "job-1");
    }
}
