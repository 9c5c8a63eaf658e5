//! Client for the control-plane job lifecycle API.
//!
//! Claim, complete and fail calls against `{base}/internal/jobs/{id}/...`,
//! authenticated with the shared worker bearer token.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClaimOutcome, ControlPlaneClient, ControlPlaneConfig, JobLifecycle};
pub use error::{ControlPlaneError, ControlResult};
pub use types::{ClaimResponse, CompleteRequest, FailRequest, MAX_ERROR_MESSAGE_CHARS};
