//! FFprobe structural metadata.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use vqc_models::{Bitrate, FrameRate, Resolution};

use crate::command::ToolCommand;
use crate::error::{MediaError, MediaResult};

/// Characters of ffprobe diagnostics kept in a failure.
const PROBE_STDERR_LIMIT: usize = 500;

/// Structural metadata of a media file. Every field may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeSnapshot {
    /// Width in pixels
    pub width: Option<u32>,
    /// Height in pixels
    pub height: Option<u32>,
    /// Frame rate (fps)
    pub fps: Option<f64>,
    /// Bitrate in bits/second
    pub bitrate_bps: Option<u64>,
}

/// FFprobe JSON output format.
#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    #[serde(default, deserialize_with = "lenient_text")]
    bit_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    #[serde(default, deserialize_with = "lenient_text")]
    codec_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    height: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    avg_frame_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    r_frame_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    bit_rate: Option<String>,
}

/// Strings pass through, numbers become their decimal text, anything else is unknown.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?
        .as_u64()
        .and_then(|n| u32::try_from(n).ok()))
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

impl ProbeSnapshot {
    /// Parse ffprobe's `-print_format json` document.
    pub fn from_json(json: &[u8]) -> MediaResult<Self> {
        let output: FfprobeOutput = serde_json::from_slice(json)?;
        Ok(Self::from_output(&output))
    }

    fn from_output(output: &FfprobeOutput) -> Self {
        let video = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));

        let fps = video.and_then(|v| {
            non_empty(&v.avg_frame_rate)
                .or_else(|| non_empty(&v.r_frame_rate))
                .and_then(parse_frame_rate)
        });

        // Container bitrate first, then the video stream's own.
        let bitrate_bps = output
            .format
            .as_ref()
            .and_then(|f| non_empty(&f.bit_rate))
            .or_else(|| video.and_then(|v| non_empty(&v.bit_rate)))
            .and_then(parse_bitrate);

        Self {
            width: video.and_then(|v| v.width),
            height: video.and_then(|v| v.height),
            fps,
            bitrate_bps,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    pub fn frame_rate(&self) -> FrameRate {
        FrameRate { value: self.fps }
    }

    pub fn bitrate(&self) -> Bitrate {
        Bitrate::from_bps(self.bitrate_bps)
    }
}

/// Probe a media file.
pub async fn probe_file(
    ffprobe_bin: &str,
    path: impl AsRef<Path>,
    timeout: Duration,
) -> MediaResult<ProbeSnapshot> {
    let path = path.as_ref();

    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let output = ToolCommand::new(ffprobe_bin)
        .args([
            "-v",
            "error",
            "-show_streams",
            "-show_format",
            "-print_format",
            "json",
        ])
        .arg(path)
        .timeout(timeout)
        .run()
        .await?
        .into_success(PROBE_STDERR_LIMIT)?;

    ProbeSnapshot::from_json(&output.stdout)
}

/// Parse a frame rate string (e.g., "30000/1001" or "29.97").
///
/// Empty strings, `0/0`, zero denominators and non-numeric parts are unknown.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "0/0" {
        return None;
    }

    let value = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };

    value.is_finite().then_some(value)
}

/// Parse a bitrate field. Only all-digit strings are accepted.
pub fn parse_bitrate(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
