//! Shared data models for the video quality-check worker.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their source locations
//! - Check kinds and computed check values
//! - The result document reported on completion
//! - Per-message job outcomes

pub mod check;
pub mod job;
pub mod outcome;
pub mod result;

// Re-export common types
pub use check::{
    Bitrate, CheckKind, CheckKindParseError, CheckSet, CheckValue, FrameRate,
    LoudnessMeasurement, Resolution,
};
pub use job::{Job, JobId, SourceLocation};
pub use outcome::JobOutcome;
pub use result::{CheckResults, ResultDocument};
