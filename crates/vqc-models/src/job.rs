//! Job definitions as handed out by the control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::check::CheckSet;

/// Unique identifier for a job.
///
/// Opaque to the worker: it is only ever echoed back to the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the source video lives in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub bucket: String,
    pub key: String,
}

impl SourceLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// A claimed job.
///
/// Read once from the claim response and dropped after the terminal report.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Job ID
    pub id: JobId,
    /// Requested check names exactly as the control plane sent them
    pub requested: Vec<String>,
    /// Source video location
    pub source: SourceLocation,
    /// Server-side status after the claim (informational)
    pub status: Option<String>,
    /// When the control plane marked the job as running
    pub started_at: Option<DateTime<Utc>>,
    /// Declared content type of the upload
    pub content_type: Option<String>,
    /// Declared upload size
    pub file_size_bytes: Option<u64>,
    /// Name of the file as uploaded by the user
    pub original_file_name: Option<String>,
}

impl Job {
    pub fn new(id: JobId, requested: Vec<String>, source: SourceLocation) -> Self {
        Self {
            id,
            requested,
            source,
            status: None,
            started_at: None,
            content_type: None,
            file_size_bytes: None,
            original_file_name: None,
        }
    }

    /// Known check kinds among the requested names, plus the names that are
    /// not check kinds. See [`CheckSet::from_names`].
    pub fn check_set(&self) -> (CheckSet, Vec<String>) {
        CheckSet::from_names(&self.requested)
    }
}
