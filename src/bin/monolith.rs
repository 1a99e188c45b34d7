//! Monolith Binary - HTTP intake plus a single sequential recording worker.
//!
//! Jobs are accepted on `POST /recordings` and executed one at a time in
//! arrival order.

use keyslice::adapters::http::intake::{self, IntakeState};
use keyslice::adapters::local_recorder;
use keyslice::application::events::{spawn_progress_logger, EventHub};
use keyslice::config::RecorderConfig;
use keyslice::domain::JobRequest;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const QUEUE_CAPACITY: usize = 32;

#[tokio::main]
async fn main() {
    let config = RecorderConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Adapters and orchestrator
    let events = Arc::new(EventHub::new());
    let _logger = spawn_progress_logger(&events);
    let recorder = match local_recorder(&config) {
        Ok(recorder) => recorder.with_events(events),
        Err(e) => {
            error!(error = %e, "failed to build key service client");
            std::process::exit(1);
        }
    };

    // 2. Worker: one job at a time
    let (jobs, mut queue) = mpsc::channel::<JobRequest>(QUEUE_CAPACITY);
    let shutdown = CancellationToken::new();
    let worker_cancel = shutdown.clone();
    let worker = tokio::spawn(async move {
        while let Some(request) = queue.recv().await {
            if worker_cancel.is_cancelled() {
                warn!(job = %request.id, "dropping queued job during shutdown");
                continue;
            }
            match recorder.execute(&request, &worker_cancel).await {
                Ok(report) => {
                    info!(job = %report.job_id, location = %report.location, "job delivered")
                }
                Err(failure) => error!(job = %request.id, %failure, "job failed"),
            }
        }
    });

    // 3. HTTP intake
    let app = intake::router(IntakeState {
        jobs,
        default_channel_id: config.default_channel_id,
        max_range_secs: config.max_range_secs,
    });

    let bind_addr = format!("{}:{}", config.addr, config.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to bind TCP listener");
            std::process::exit(1);
        }
    };
    info!("Listening at {}:{}", config.addr, config.port);

    let signal_cancel = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            signal_cancel.cancel();
        })
        .await;
    if let Err(e) = served {
        error!(error = %e, "server failed");
    }

    // The router held the only sender; the worker drains and exits.
    if let Err(e) = worker.await {
        error!(error = %e, "worker task panicked");
    }
}
