//! Control-plane HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use vqc_models::{Job, JobId, ResultDocument};

use crate::error::{ControlPlaneError, ControlResult};
use crate::types::{ClaimResponse, CompleteRequest, FailRequest, NotClaimableResponse};

/// How much of an unexpected body is kept in errors.
const BODY_SNIPPET_CHARS: usize = 200;

/// Configuration for the control-plane client.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// API base URL, e.g. `http://localhost:3000/api`
    pub base_url: String,
    /// Shared worker bearer token
    pub token: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ControlPlaneConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> ControlResult<Self> {
        let token = std::env::var("WORKER_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ControlPlaneError::config("WORKER_TOKEN is not set"))?;
        let base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api".to_string());

        let mut config = Self::new(base_url, token);
        config.timeout = Duration::from_secs(
            std::env::var("CONTROL_PLANE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        );
        Ok(config)
    }
}

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// The job is now ours.
    Claimed(Job),
    /// Already claimed or finished elsewhere.
    NotClaimable { status: Option<String> },
}

/// Job lifecycle seam used by the worker.
#[async_trait]
pub trait JobLifecycle: Send + Sync {
    /// Atomically move the job to running.
    async fn claim(&self, job_id: &JobId) -> ControlResult<ClaimOutcome>;

    /// Report success with the result document.
    async fn complete(&self, job_id: &JobId, document: &ResultDocument) -> ControlResult<()>;

    /// Report failure. Best effort: errors are logged, never returned.
    async fn fail(&self, job_id: &JobId, message: &str);
}

/// Client for the internal job endpoints.
pub struct ControlPlaneClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl ControlPlaneClient {
    /// Create a new client.
    pub fn new(config: ControlPlaneConfig) -> ControlResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ControlPlaneError::config(format!("invalid API base URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ControlPlaneError::config(format!(
                "API base URL cannot carry a path: {}",
                config.base_url
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ControlPlaneError::Network)?;

        Ok(Self {
            http,
            base_url,
            token: config.token,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> ControlResult<Self> {
        Self::new(ControlPlaneConfig::from_env()?)
    }

    /// `{base}/internal/jobs/{id}/{action}` with the id encoded as one segment.
    pub(crate) fn endpoint(&self, job_id: &JobId, action: &str) -> ControlResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ControlPlaneError::config("API base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["internal", "jobs", job_id.as_str(), action]);
        Ok(url)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        job_id: &JobId,
        action: &str,
        body: Option<&B>,
    ) -> ControlResult<(StatusCode, String)> {
        let url = self.endpoint(job_id, action)?;
        debug!("POST {}", url);

        let mut request = self.http.post(url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Err(ControlPlaneError::Redirected {
                status: status.as_u16(),
                location,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let body = response.text().await?;

        if !content_type.contains("application/json") {
            return Err(ControlPlaneError::NonJson {
                status: status.as_u16(),
                content_type,
                body: snippet(&body),
            });
        }

        Ok((status, body))
    }

    /// Report failure, returning any error instead of logging it.
    pub async fn try_fail(&self, job_id: &JobId, message: &str) -> ControlResult<()> {
        let request = FailRequest::new(message);
        let (status, body) = self.post(job_id, "fail", Some(&request)).await?;
        ensure_success(status, &body)
    }
}

#[async_trait]
impl JobLifecycle for ControlPlaneClient {
    async fn claim(&self, job_id: &JobId) -> ControlResult<ClaimOutcome> {
        let (status, body) = self.post::<()>(job_id, "claim", None).await?;

        if status == StatusCode::CONFLICT {
            let response: NotClaimableResponse = serde_json::from_str(&body).unwrap_or_default();
            let current = response.job.and_then(|j| j.status);
            info!(
                job_id = %job_id,
                status = current.as_deref().unwrap_or("unknown"),
                "Job not claimable: {}",
                response.error.as_deref().unwrap_or("no reason given")
            );
            return Ok(ClaimOutcome::NotClaimable { status: current });
        }

        ensure_success(status, &body)?;
        let response: ClaimResponse = serde_json::from_str(&body)?;
        Ok(ClaimOutcome::Claimed(response.into_job(job_id)?))
    }

    async fn complete(&self, job_id: &JobId, document: &ResultDocument) -> ControlResult<()> {
        let request = CompleteRequest {
            result_json: document,
        };
        let (status, body) = self.post(job_id, "complete", Some(&request)).await?;
        ensure_success(status, &body)
    }

    async fn fail(&self, job_id: &JobId, message: &str) {
        if let Err(e) = self.try_fail(job_id, message).await {
            warn!(job_id = %job_id, "Failed to report job failure: {}", e);
        }
    }
}

fn ensure_success(status: StatusCode, body: &str) -> ControlResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ControlPlaneError::UnexpectedStatus {
            status: status.as_u16(),
            body: snippet(body),
        })
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vqc_models::{CheckResults, CheckValue, Resolution};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ControlPlaneClient {
        let config = ControlPlaneConfig::new(format!("{}/api/", server.uri()), "secret");
        ControlPlaneClient::new(config).unwrap()
    }

    fn claimed_body() -> serde_json::Value {
        json!({
            "ok": true,
            "job": {
                "id": "job-1",
                "status": "RUNNING",
                "requested": ["RESOLUTION"],
                "startedAt": "2025-01-15T10:30:00.000Z",
                "videoAsset": {
                    "storageBucket": "uploads",
                    "storageKey": "videos/a.mp4",
                    "contentType": "video/mp4",
                    "fileSizeBytes": "1024",
                    "originalFileName": "a.mp4"
                }
            }
        })
    }

    #[test]
    fn test_config_defaults() {
        let config = ControlPlaneConfig::new("http://localhost:3000/api/", "t");
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_encodes_job_id() {
        let config = ControlPlaneConfig::new("http://localhost:3000/api", "t");
        let client = ControlPlaneClient::new(config).unwrap();

        let url = client.endpoint(&JobId::from_string("job-1"), "claim").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/internal/jobs/job-1/claim");

        let url = client.endpoint(&JobId::from_string("a/b c"), "fail").unwrap();
        assert_eq!(url.path(), "/api/internal/jobs/a%2Fb%20c/fail");
    }

    #[tokio::test]
    async fn test_claim_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/internal/jobs/job-1/claim"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(claimed_body()))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .claim(&JobId::from_string("job-1"))
            .await
            .unwrap();

        match outcome {
            ClaimOutcome::Claimed(job) => {
                assert_eq!(job.id.as_str(), "job-1");
                assert_eq!(job.source.bucket, "uploads");
                assert_eq!(job.source.key, "videos/a.mp4");
                assert_eq!(job.file_size_bytes, Some(1024));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_claim_conflict_is_not_claimable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/internal/jobs/job-1/claim"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": "Job not claimable",
                "job": {"id": "job-1", "status": "DONE"}
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .claim(&JobId::from_string("job-1"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ClaimOutcome::NotClaimable {
                status: Some("DONE".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_claim_conflict_with_null_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"error": "Job not claimable", "job": null})),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .claim(&JobId::from_string("missing"))
            .await
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::NotClaimable { status: None });
    }

    #[tokio::test]
    async fn test_redirect_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(307).insert_header("Location", "https://example.com/login"),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .claim(&JobId::from_string("job-1"))
            .await
            .unwrap_err();
        match err {
            ControlPlaneError::Redirected { status, location } => {
                assert_eq!(status, 307);
                assert_eq!(location, "https://example.com/login");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_response_is_an_error() {
        let server = MockServer::start().await;
        let page = format!("<html>{}</html>", "x".repeat(500));
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .claim(&JobId::from_string("job-1"))
            .await
            .unwrap_err();
        match err {
            ControlPlaneError::NonJson {
                status,
                content_type,
                body,
            } => {
                assert_eq!(status, 200);
                assert!(content_type.starts_with("text/"));
                assert_eq!(body.chars().count(), BODY_SNIPPET_CHARS);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_claim_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .claim(&JobId::from_string("job-1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_complete_posts_result_json() {
        let server = MockServer::start().await;
        let mut checks = CheckResults::new();
        checks.insert(CheckValue::Resolution(Resolution {
            width: Some(1920),
            height: Some(1080),
        }));
        let document = ResultDocument::new(
            JobId::from_string("job-1"),
            vec!["RESOLUTION".into()],
            checks,
        );

        Mock::given(method("POST"))
            .and(path("/api/internal/jobs/job-1/complete"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({
                "resultJson": {
                    "jobId": "job-1",
                    "requested": ["RESOLUTION"],
                    "checks": {"RESOLUTION": {"width": 1920, "height": 1080}}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .complete(&JobId::from_string("job-1"), &document)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_complete_rejection_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "bad"})))
            .mount(&server)
            .await;

        let document = ResultDocument::new(JobId::from_string("job-1"), vec![], CheckResults::new());
        let err = client_for(&server)
            .complete(&JobId::from_string("job-1"), &document)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::UnexpectedStatus { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_fail_swallows_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/internal/jobs/job-1/fail"))
            .and(body_json(json!({"errorMessage": "ffprobe failed"})))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "oops"})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.fail(&JobId::from_string("job-1"), "ffprobe failed").await;

        let err = client
            .try_fail(&JobId::from_string("job-1"), "ffprobe failed")
            .await;
        assert!(err.is_err());
    }
}
