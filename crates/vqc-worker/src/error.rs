//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Anything that aborts a claimed job.
///
/// The display text is what gets reported to the control plane.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Storage error: {0}")]
    Storage(#[from] vqc_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] vqc_media::MediaError),

    #[error("Control plane error: {0}")]
    Control(#[from] vqc_control::ControlPlaneError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::Storage(_) => "storage",
            WorkerError::Media(_) => "media",
            WorkerError::Control(_) => "control_plane",
            WorkerError::Io(_) => "io",
        }
    }
}
