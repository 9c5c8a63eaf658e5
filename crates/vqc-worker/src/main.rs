//! Video quality-check worker binary.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use tracing::{error, info, warn};

use vqc_control::ControlPlaneClient;
use vqc_media::{FfmpegTools, MediaAnalyzer, ToolConfig};
use vqc_queue::{QueueConfig, SqsQueue};
use vqc_storage::{S3Store, StorageConfig};
use vqc_worker::{init_tracing, metrics, Dispatcher, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting vqc-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        match metrics::install_exporter(addr) {
            Ok(()) => info!("Prometheus exporter listening on {}", addr),
            Err(e) => {
                error!("Failed to install Prometheus exporter: {}", e);
                std::process::exit(1);
            }
        }
    }

    let tools = FfmpegTools::new(ToolConfig::from_env());
    if let Err(e) = tools.check_available() {
        error!("Media tools unavailable: {}", e);
        std::process::exit(1);
    }

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;

    let queue_config = match QueueConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load queue config: {}", e);
            std::process::exit(1);
        }
    };
    let queue = SqsQueue::new(&sdk_config, queue_config);

    let store = match StorageConfig::from_env().and_then(|c| S3Store::new(&sdk_config, &c)) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let control = match ControlPlaneClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create control plane client: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = WorkerContext::new(
        Arc::new(store),
        Arc::new(control),
        MediaAnalyzer::new(Arc::new(tools)),
        config,
    );
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(queue), Arc::new(ctx)));

    // Setup signal handlers
    let signal_dispatcher = Arc::clone(&dispatcher);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, finishing current message");
        signal_dispatcher.shutdown();
    });

    dispatcher.run().await;

    info!("Worker shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
