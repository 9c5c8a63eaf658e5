//! S3 client implementation.

use std::path::Path;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use aws_types::SdkConfig;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use vqc_models::SourceLocation;

use crate::error::{StorageError, StorageResult};

/// Object-storage seam used by the worker.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download `source` to `path`, returning the number of bytes written.
    async fn download(&self, source: &SourceLocation, path: &Path) -> StorageResult<u64>;
}

/// Configuration for the S3 client.
///
/// Region and default credentials come from the shared SDK config; the
/// optional fields target an S3-compatible endpoint instead of AWS.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Custom endpoint URL (S3-compatible services)
    pub endpoint_url: Option<String>,
    /// Static access key ID for the custom endpoint
    pub access_key_id: Option<String>,
    /// Static secret access key for the custom endpoint
    pub secret_access_key: Option<String>,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let config = Self {
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok().filter(|s| !s.is_empty()),
            access_key_id: std::env::var("S3_ACCESS_KEY_ID").ok().filter(|s| !s.is_empty()),
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Static credentials must be given as a pair.
    pub fn validate(&self) -> StorageResult<()> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(_), None) => Err(StorageError::config_error(
                "S3_ACCESS_KEY_ID is set but S3_SECRET_ACCESS_KEY is not",
            )),
            (None, Some(_)) => Err(StorageError::config_error(
                "S3_SECRET_ACCESS_KEY is set but S3_ACCESS_KEY_ID is not",
            )),
            _ => Ok(()),
        }
    }
}

/// S3 storage client.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Create a new client from the shared SDK config.
    pub fn new(sdk_config: &SdkConfig, config: &StorageConfig) -> StorageResult<Self> {
        config.validate()?;

        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);

        if let Some(endpoint_url) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url).force_path_style(true);
        }

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "vqc-static",
            ));
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn download(&self, source: &SourceLocation, path: &Path) -> StorageResult<u64> {
        debug!("Downloading {} to {}", source, path.display());

        let response = self
            .client
            .get_object()
            .bucket(&source.bucket)
            .key(&source.key)
            .send()
            .await
            .map_err(|e| {
                let no_such_key = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if no_such_key {
                    StorageError::not_found(source.to_string())
                } else {
                    StorageError::download_failed(format!("{}: {}", source, DisplayErrorContext(&e)))
                }
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut body = response.body.into_async_read();
        let mut file = tokio::fs::File::create(path).await?;
        let written = tokio::io::copy(&mut body, &mut file).await.map_err(|e| {
            StorageError::download_failed(format!("{}: stream interrupted: {}", source, e))
        })?;
        file.flush().await?;

        info!("Downloaded {} ({} bytes) to {}", source, written, path.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_requires_credential_pair() {
        let config = StorageConfig {
            endpoint_url: Some("http://localhost:9000".into()),
            access_key_id: Some("minio".into()),
            secret_access_key: None,
        };
        assert!(matches!(config.validate(), Err(StorageError::ConfigError(_))));

        let config = StorageConfig {
            secret_access_key: Some("minio123".into()),
            ..config
        };
        assert!(config.validate().is_ok());
        assert!(StorageConfig::default().validate().is_ok());
    }
}
