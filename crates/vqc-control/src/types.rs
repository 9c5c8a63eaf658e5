//! Control-plane wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use vqc_models::{Job, JobId, ResultDocument, SourceLocation};

use crate::error::{ControlPlaneError, ControlResult};

/// Longest failure message the control plane accepts.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 4000;

const EMPTY_ERROR_MESSAGE: &str = "Job failed without an error message";

/// Successful claim response.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimResponse {
    pub job: Option<ClaimedJob>,
}

/// Job as returned by a successful claim.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedJob {
    pub status: Option<String>,
    pub requested: Vec<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub video_asset: Option<VideoAsset>,
}

/// Uploaded video referenced by a job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAsset {
    pub storage_bucket: String,
    pub storage_key: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Sent as a decimal string; numbers are accepted too.
    #[serde(default, deserialize_with = "deserialize_size")]
    pub file_size_bytes: Option<u64>,
    #[serde(default)]
    pub original_file_name: Option<String>,
}

/// Body of a 409 claim response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotClaimableResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub job: Option<ExistingJob>,
}

/// Current state of a job that could not be claimed.
#[derive(Debug, Clone, Deserialize)]
pub struct ExistingJob {
    pub status: Option<String>,
}

impl ClaimResponse {
    /// Convert into a domain job for `job_id`.
    pub fn into_job(self, job_id: &JobId) -> ControlResult<Job> {
        let claimed = self
            .job
            .ok_or_else(|| ControlPlaneError::invalid_response("claim response has no job"))?;
        let asset = claimed.video_asset.ok_or_else(|| {
            ControlPlaneError::invalid_response("claimed job has no video asset")
        })?;

        let mut job = Job::new(
            job_id.clone(),
            claimed.requested,
            SourceLocation::new(asset.storage_bucket, asset.storage_key),
        );
        job.status = claimed.status;
        job.started_at = claimed.started_at;
        job.content_type = asset.content_type;
        job.file_size_bytes = asset.file_size_bytes;
        job.original_file_name = asset.original_file_name;
        Ok(job)
    }
}

/// Body of the complete call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest<'a> {
    pub result_json: &'a ResultDocument,
}

/// Body of the fail call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailRequest {
    pub error_message: String,
}

impl FailRequest {
    /// Builds a body the control plane will accept: never empty and at most
    /// [`MAX_ERROR_MESSAGE_CHARS`] characters.
    pub fn new(message: &str) -> Self {
        let error_message = if message.trim().is_empty() {
            EMPTY_ERROR_MESSAGE.to_string()
        } else {
            message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
        };
        Self { error_message }
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(Value::Number(n)) => n.as_u64(),
        _ => None,
    })
}
