//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause after a failed job or a failed receive
    pub failure_pause: Duration,
    /// Parent directory for per-job scratch directories (system temp if unset)
    pub work_dir: Option<PathBuf>,
    /// Prometheus exporter listen address
    pub metrics_addr: Option<SocketAddr>,
    /// AWS region for the queue and storage clients
    pub aws_region: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            failure_pause: Duration::from_millis(2000),
            work_dir: None,
            metrics_addr: None,
            aws_region: "eu-central-1".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            failure_pause: Duration::from_millis(
                std::env::var("WORKER_FAILURE_PAUSE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            metrics_addr: std::env::var("METRICS_ADDR")
                .ok()
                .and_then(|s| s.parse().ok()),
            aws_region: std::env::var("AWS_REGION")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "eu-central-1".to_string()),
        }
    }

    /// Create a scratch directory for one job. Removed when dropped.
    pub async fn job_dir(&self) -> std::io::Result<TempDir> {
        let parent = match &self.work_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                dir.clone()
            }
            None => std::env::temp_dir(),
        };

        tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix("vqc-job-")
                .tempdir_in(parent)
        })
        .await
        .map_err(std::io::Error::other)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.failure_pause, Duration::from_secs(2));
        assert!(config.work_dir.is_none());
        assert_eq!(config.aws_region, "eu-central-1");
    }

    #[tokio::test]
    async fn test_job_dir_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            work_dir: Some(parent.path().join("jobs")),
            ..WorkerConfig::default()
        };

        let dir = config.job_dir().await.unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.starts_with(parent.path().join("jobs")));
        assert!(path.exists());

        drop(dir);
        assert!(!path.exists());
    }
}
