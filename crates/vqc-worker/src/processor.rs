//! Job processing: claim, download, analyze, complete.

use std::sync::Arc;

use vqc_control::{ClaimOutcome, JobLifecycle};
use vqc_media::MediaAnalyzer;
use vqc_models::{JobId, JobOutcome, ResultDocument};
use vqc_storage::ObjectStore;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;

/// File name of the downloaded source inside the job's scratch directory.
const SOURCE_FILE_NAME: &str = "video";

/// Collaborators shared by every job.
pub struct WorkerContext {
    pub store: Arc<dyn ObjectStore>,
    pub control: Arc<dyn JobLifecycle>,
    pub analyzer: MediaAnalyzer,
    pub config: WorkerConfig,
}

impl WorkerContext {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        control: Arc<dyn JobLifecycle>,
        analyzer: MediaAnalyzer,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            control,
            analyzer,
            config,
        }
    }
}

/// Run one job to a terminal report.
///
/// Returns `Completed` or `NotClaimable`. Any error means the job was not
/// completed; reporting it is left to the caller.
pub async fn process_job(
    ctx: &WorkerContext,
    job_id: &JobId,
    logger: &JobLogger,
) -> WorkerResult<JobOutcome> {
    let job = match ctx.control.claim(job_id).await? {
        ClaimOutcome::Claimed(job) => job,
        ClaimOutcome::NotClaimable { status } => {
            logger.log_not_claimable(status.as_deref());
            return Ok(JobOutcome::NotClaimable);
        }
    };

    logger.log_claimed(&job);

    let (checks, unknown) = job.check_set();
    if !unknown.is_empty() {
        logger.log_warning(&format!("ignoring unknown checks: {}", unknown.join(", ")));
    }

    // Removed on every exit path when `scratch` drops.
    let scratch = ctx.config.job_dir().await?;
    let local_path = scratch.path().join(SOURCE_FILE_NAME);

    let bytes = ctx.store.download(&job.source, &local_path).await?;
    logger.log_progress(&format!("downloaded {} bytes", bytes));

    let results = ctx.analyzer.analyze(&local_path, &checks).await?;
    logger.log_progress(&format!("computed {} checks", results.len()));

    let document = ResultDocument::new(job.id.clone(), job.requested.clone(), results);
    ctx.control.complete(&job.id, &document).await?;

    logger.log_progress("result reported");
    Ok(JobOutcome::Completed)
}
