//! Terminal outcome of handling one queue message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the dispatcher finished with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Claimed, analyzed and reported complete
    Completed,
    /// Claimed (or attempted) and reported failed
    Failed,
    /// Another worker owns or already finished the job
    NotClaimable,
    /// The queue entry could not be decoded
    MalformedMessage,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Completed => "completed",
            JobOutcome::Failed => "failed",
            JobOutcome::NotClaimable => "not_claimable",
            JobOutcome::MalformedMessage => "malformed_message",
        }
    }

    /// Whether the message can be deleted from the queue.
    ///
    /// Failed jobs stay in the queue so redelivery retries them.
    pub fn should_acknowledge(&self) -> bool {
        !matches!(self, JobOutcome::Failed)
    }

    /// Whether this worker actually processed the job.
    pub fn did_work(&self) -> bool {
        matches!(self, JobOutcome::Completed | JobOutcome::Failed)
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_failures_are_left_for_redelivery() {
        assert!(JobOutcome::Completed.should_acknowledge());
        assert!(JobOutcome::NotClaimable.should_acknowledge());
        assert!(JobOutcome::MalformedMessage.should_acknowledge());
        assert!(!JobOutcome::Failed.should_acknowledge());
    }

    #[test]
    fn test_did_work() {
        assert!(JobOutcome::Completed.did_work());
        assert!(JobOutcome::Failed.did_work());
        assert!(!JobOutcome::NotClaimable.did_work());
        assert!(!JobOutcome::MalformedMessage.did_work());
    }
}
