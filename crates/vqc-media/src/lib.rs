//! ffprobe/ffmpeg wrappers for video quality checks.
//!
//! This crate provides:
//! - A tool runner with timeouts and exit-code capture
//! - Structural probe parsing (resolution, frame rate, bitrate)
//! - Loudness measurement extraction from `loudnorm` diagnostics
//! - The analyzer that assembles requested checks

pub mod analyzer;
pub mod command;
pub mod error;
pub mod loudness;
pub mod probe;

pub use analyzer::{FfmpegTools, MediaAnalyzer, MediaTools, ToolConfig};
pub use command::{check_tool, truncate_chars, ToolCommand, ToolOutput};
pub use error::{MediaError, MediaResult};
pub use loudness::{extract_measurement, measure_loudness};
pub use probe::{parse_bitrate, parse_frame_rate, probe_file, ProbeSnapshot};
