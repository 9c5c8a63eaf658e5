//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while inspecting a media file.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{tool} not found in PATH")]
    ToolNotFound { tool: String },

    #[error("{tool} failed ({}): {stderr}", exit_label(.exit_code))]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: String, secs: u64 },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Could not parse loudnorm JSON output: {0}")]
    LoudnessParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl MediaError {
    /// Create a tool failure error.
    pub fn tool_failed(tool: impl Into<String>, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a loudness parse error.
    pub fn loudness_parse(message: impl Into<String>) -> Self {
        Self::LoudnessParse(message.into())
    }

    /// Exit code of a failed tool, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            MediaError::ToolFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}
