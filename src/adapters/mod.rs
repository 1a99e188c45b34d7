//! Adapters - Concrete implementations of ports.

pub mod http;
pub mod local;
pub mod process;

use crate::application::orchestrator::JobOrchestrator;
use crate::config::RecorderConfig;
use http::HttpKeyLookup;
use local::FsDelivery;
use process::{FfmpegMediaTool, YtDlpDownloader};

/// Orchestrator wired to the HTTP key service, yt-dlp, ffmpeg and a local
/// delivery directory.
pub type LocalRecorder =
    JobOrchestrator<HttpKeyLookup, YtDlpDownloader, FfmpegMediaTool, FsDelivery>;

pub fn local_recorder(config: &RecorderConfig) -> Result<LocalRecorder, reqwest::Error> {
    Ok(JobOrchestrator::new(
        HttpKeyLookup::new(config)?,
        YtDlpDownloader::new(config),
        FfmpegMediaTool::new(config),
        FsDelivery::new(config),
        config,
    ))
}
