//! Integrated loudness via ffmpeg's `loudnorm` filter.
//!
//! With `print_format=json` the filter writes its measurement block into
//! stderr alongside ordinary log lines, with no delimiter. Extraction tries
//! an object anchored to the end of the output first, then an object starting
//! at the last opening brace.

use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use vqc_models::LoudnessMeasurement;

use crate::command::ToolCommand;
use crate::error::{MediaError, MediaResult};

/// Characters of ffmpeg diagnostics kept in a failure.
const LOUDNESS_STDERR_LIMIT: usize = 800;

/// Measure integrated loudness of a media file.
pub async fn measure_loudness(
    ffmpeg_bin: &str,
    path: impl AsRef<Path>,
    timeout: Duration,
) -> MediaResult<LoudnessMeasurement> {
    let path = path.as_ref();

    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let output = ToolCommand::new(ffmpeg_bin)
        .arg("-hide_banner")
        .arg("-i")
        .arg(path)
        .args(["-af", "loudnorm=print_format=json", "-f", "null", "-"])
        .timeout(timeout)
        .run()
        .await?
        .into_success(LOUDNESS_STDERR_LIMIT)?;

    extract_measurement(&output.stderr)
}

/// Pull the loudnorm JSON object out of mixed diagnostic text.
pub fn extract_measurement(text: &str) -> MediaResult<LoudnessMeasurement> {
    if let Some(object) = anchored_object(text) {
        return Ok(LoudnessMeasurement(object));
    }

    debug!("No JSON object at end of loudnorm output, scanning from last brace");

    if !text.contains('{') {
        return Err(MediaError::loudness_parse("no JSON object in output"));
    }

    last_brace_object(text)
        .map(LoudnessMeasurement)
        .ok_or_else(|| MediaError::loudness_parse("output after last '{' is not a JSON object"))
}

/// Object that runs up to the end of the trimmed text.
///
/// Candidates are tried from the leftmost brace, so an unrelated brace earlier
/// in the log only costs a failed attempt.
fn anchored_object(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    if !trimmed.ends_with('}') {
        return None;
    }

    trimmed
        .match_indices('{')
        .find_map(|(start, _)| serde_json::from_str::<Map<String, Value>>(&trimmed[start..]).ok())
}

/// First object starting at the last brace; trailing text is ignored.
fn last_brace_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.rfind('{')?;
    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Map<String, Value>>()
        .next()?
        .ok()
}
