//! Media analyzer.
//!
//! Composes the structural probe and the loudness pass into the checks
//! mapping for one file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use vqc_models::{CheckKind, CheckResults, CheckSet, CheckValue, LoudnessMeasurement};

use crate::command::check_tool;
use crate::error::MediaResult;
use crate::loudness::measure_loudness;
use crate::probe::{probe_file, ProbeSnapshot};

/// External tool seam used by the analyzer.
#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Structural metadata of the file.
    async fn probe(&self, path: &Path) -> MediaResult<ProbeSnapshot>;

    /// Loudness measurement of the file's audio.
    async fn loudness(&self, path: &Path) -> MediaResult<LoudnessMeasurement>;
}

/// Tool configuration.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// ffprobe binary name or path
    pub ffprobe_bin: String,
    /// ffmpeg binary name or path
    pub ffmpeg_bin: String,
    /// Timeout for the structural probe
    pub probe_timeout: Duration,
    /// Timeout for the loudness pass (reads the whole file)
    pub loudness_timeout: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffprobe_bin: "ffprobe".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            probe_timeout: Duration::from_secs(60),
            loudness_timeout: Duration::from_secs(600),
        }
    }
}

impl ToolConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ffprobe_bin: std::env::var("FFPROBE_BIN").unwrap_or_else(|_| "ffprobe".to_string()),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            probe_timeout: Duration::from_secs(
                std::env::var("PROBE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            loudness_timeout: Duration::from_secs(
                std::env::var("LOUDNESS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// ffprobe/ffmpeg backed tools.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTools {
    config: ToolConfig,
}

impl FfmpegTools {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    /// Verify both binaries resolve.
    pub fn check_available(&self) -> MediaResult<()> {
        check_tool(&self.config.ffprobe_bin)?;
        check_tool(&self.config.ffmpeg_bin)?;
        Ok(())
    }
}

#[async_trait]
impl MediaTools for FfmpegTools {
    async fn probe(&self, path: &Path) -> MediaResult<ProbeSnapshot> {
        probe_file(&self.config.ffprobe_bin, path, self.config.probe_timeout).await
    }

    async fn loudness(&self, path: &Path) -> MediaResult<LoudnessMeasurement> {
        measure_loudness(&self.config.ffmpeg_bin, path, self.config.loudness_timeout).await
    }
}

/// Produces the checks mapping for a local file.
#[derive(Clone)]
pub struct MediaAnalyzer {
    tools: Arc<dyn MediaTools>,
}

impl MediaAnalyzer {
    pub fn new(tools: Arc<dyn MediaTools>) -> Self {
        Self { tools }
    }

    /// Run the requested checks against `path`.
    ///
    /// The probe always runs once; the loudness pass only when requested. Any
    /// failure aborts the whole analysis.
    pub async fn analyze(&self, path: &Path, requested: &CheckSet) -> MediaResult<CheckResults> {
        let mut checks = CheckResults::new();

        let snapshot = self.tools.probe(path).await?;
        debug!(?snapshot, "Probe finished");

        for kind in requested.iter() {
            match kind {
                CheckKind::Resolution => checks.insert(CheckValue::Resolution(snapshot.resolution())),
                CheckKind::Fps => checks.insert(CheckValue::Fps(snapshot.frame_rate())),
                CheckKind::Bitrate => checks.insert(CheckValue::Bitrate(snapshot.bitrate())),
                CheckKind::AvgLoudness => {}
            }
        }

        if requested.contains(CheckKind::AvgLoudness) {
            info!("Running loudness analysis on {}", path.display());
            let measurement = self.tools.loudness(path).await?;
            checks.insert(CheckValue::AvgLoudness(measurement));
        }

        Ok(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeTools {
        snapshot: ProbeSnapshot,
        loudness_fails: bool,
        loudness_calls: AtomicU32,
    }

    impl FakeTools {
        fn new(snapshot: ProbeSnapshot) -> Self {
            Self {
                snapshot,
                loudness_fails: false,
                loudness_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaTools for FakeTools {
        async fn probe(&self, _path: &Path) -> MediaResult<ProbeSnapshot> {
            Ok(self.snapshot)
        }

        async fn loudness(&self, _path: &Path) -> MediaResult<LoudnessMeasurement> {
            self.loudness_calls.fetch_add(1, Ordering::SeqCst);
            if self.loudness_fails {
                return Err(MediaError::tool_failed("ffmpeg", Some(1), "Invalid data found"));
            }
            let object = json!({"input_i": "-23.00"});
            Ok(LoudnessMeasurement(object.as_object().cloned().unwrap_or_default()))
        }
    }

    fn hd_snapshot() -> ProbeSnapshot {
        ProbeSnapshot {
            width: Some(1920),
            height: Some(1080),
            fps: Some(25.0),
            bitrate_bps: Some(8_000_000),
        }
    }

    #[tokio::test]
    async fn test_only_requested_kinds_are_populated() {
        let tools = Arc::new(FakeTools::new(hd_snapshot()));
        let analyzer = MediaAnalyzer::new(tools.clone());
        let requested: CheckSet = [CheckKind::Fps].into_iter().collect();

        let checks = analyzer.analyze(Path::new("video"), &requested).await.unwrap();

        assert_eq!(checks.kinds().collect::<Vec<_>>(), vec![CheckKind::Fps]);
        assert!(checks.get(CheckKind::Resolution).is_none());
        assert!(checks.get(CheckKind::AvgLoudness).is_none());
        assert_eq!(tools.loudness_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolution_and_bitrate() {
        let analyzer = MediaAnalyzer::new(Arc::new(FakeTools::new(hd_snapshot())));
        let requested: CheckSet = [CheckKind::Resolution, CheckKind::Bitrate].into_iter().collect();

        let checks = analyzer.analyze(Path::new("video"), &requested).await.unwrap();

        assert_eq!(
            serde_json::to_value(&checks).unwrap(),
            json!({
                "RESOLUTION": {"width": 1920, "height": 1080},
                "BITRATE": {"bps": 8000000, "kbps": 8000.0}
            })
        );
    }

    #[tokio::test]
    async fn test_loudness_runs_when_requested() {
        let tools = Arc::new(FakeTools::new(hd_snapshot()));
        let analyzer = MediaAnalyzer::new(tools.clone());
        let requested: CheckSet = [CheckKind::AvgLoudness].into_iter().collect();

        let checks = analyzer.analyze(Path::new("video"), &requested).await.unwrap();

        assert_eq!(tools.loudness_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            serde_json::to_value(&checks).unwrap(),
            json!({"AVG_LOUDNESS": {"input_i": "-23.00"}})
        );
    }

    #[tokio::test]
    async fn test_loudness_failure_aborts_analysis() {
        let mut tools = FakeTools::new(hd_snapshot());
        tools.loudness_fails = true;
        let analyzer = MediaAnalyzer::new(Arc::new(tools));
        let requested: CheckSet = [CheckKind::Resolution, CheckKind::AvgLoudness]
            .into_iter()
            .collect();

        let err = analyzer.analyze(Path::new("video"), &requested).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn test_tool_config_defaults() {
        let config = ToolConfig::default();
        assert_eq!(config.ffprobe_bin, "ffprobe");
        assert_eq!(config.probe_timeout, Duration::from_secs(60));
        assert_eq!(config.loudness_timeout, Duration::from_secs(600));
    }
}
