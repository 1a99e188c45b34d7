//! One-shot recorder.
//!
//! Usage: `record "<DD-MM-YYYY HH:MM AM/PM> - <DD-MM-YYYY HH:MM AM/PM>" [channel_id]`

use keyslice::adapters::local_recorder;
use keyslice::application::events::{spawn_progress_logger, EventHub};
use keyslice::config::RecorderConfig;
use keyslice::domain::{JobRequest, TimeRange};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = RecorderConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(raw_range) = args.next() else {
        eprintln!(
            "usage: record \"<DD-MM-YYYY HH:MM AM/PM> - <DD-MM-YYYY HH:MM AM/PM>\" [channel_id]"
        );
        return ExitCode::from(2);
    };
    let channel_id = match args.next().map(|raw| raw.parse::<u32>()) {
        None => config.default_channel_id,
        Some(Ok(id)) => id,
        Some(Err(e)) => {
            eprintln!("invalid channel id: {}", e);
            return ExitCode::from(2);
        }
    };
    let range = match TimeRange::parse_local(&raw_range, config.max_range_secs) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let events = Arc::new(EventHub::new());
    let _logger = spawn_progress_logger(&events);
    let recorder = match local_recorder(&config) {
        Ok(recorder) => recorder.with_events(events),
        Err(e) => {
            error!(error = %e, "failed to build key service client");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current stage");
            on_signal.cancel();
        }
    });

    let request = JobRequest::new(range, channel_id);
    match recorder.execute(&request, &cancel).await {
        Ok(report) => {
            info!(location = %report.location, segments = report.segments, "recording delivered");
            println!("{}", report.location);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("{}", failure);
            ExitCode::FAILURE
        }
    }
}
