//! Control-plane client error types.

use thiserror::Error;

pub type ControlResult<T> = Result<T, ControlPlaneError>;

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("Control plane configuration error: {0}")]
    Config(String),

    #[error("Redirected ({status}) to: {location}")]
    Redirected { status: u16, location: String },

    #[error("Non-JSON response ({status}) content-type={content_type} body={body}")]
    NonJson {
        status: u16,
        content_type: String,
        body: String,
    },

    #[error("Control plane returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ControlPlaneError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// HTTP status of the offending response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Redirected { status, .. }
            | Self::NonJson { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
