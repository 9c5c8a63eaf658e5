use std::path::Path;

use vqc_media::{check_tool, ToolConfig};
use vqc_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env();
    let work_dir = config
        .work_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);

    println!(
        "worker-selfcheck: starting with work_dir={}",
        work_dir.display()
    );
    ensure_workdir(&work_dir).await?;
    ensure_tools(&ToolConfig::from_env())?;
    ensure_env_present(&["WORKER_TOKEN", "SQS_QUEUE_URL"])?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;

    let probe = path.join(".vqc-selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("work dir {} is not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_tools(config: &ToolConfig) -> anyhow::Result<()> {
    for tool in [&config.ffprobe_bin, &config.ffmpeg_bin] {
        let resolved = check_tool(tool)?;
        println!("worker-selfcheck: {} -> {}", tool, resolved.display());
    }
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).map(|v| v.is_empty()).unwrap_or(true) {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
