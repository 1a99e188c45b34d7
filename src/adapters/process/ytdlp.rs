use super::run_with_timeout;
use crate::config::RecorderConfig;
use crate::error::PortError;
use crate::ports::downloader::{DownloadRequest, DownloaderPort};
use async_trait::async_trait;
use std::ffi::OsString;
use std::time::Duration;
use tracing::info;

/// Downloads one elementary stream of a DASH manifest with yt-dlp, keeping the
/// fragments encrypted.
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    program: String,
    leading_args: Vec<String>,
    headers: Vec<String>,
    geo_bypass_country: Option<String>,
    timeout: Duration,
}

impl YtDlpDownloader {
    pub fn new(config: &RecorderConfig) -> Self {
        Self {
            program: config.downloader_program.clone(),
            leading_args: config.downloader_args.clone(),
            headers: config.downloader_headers.clone(),
            geo_bypass_country: config.geo_bypass_country.clone(),
            timeout: config.download_timeout,
        }
    }

    pub fn args(&self, request: &DownloadRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        if let Some(country) = &self.geo_bypass_country {
            args.push("--geo-bypass-country".into());
            args.push(country.into());
        }
        args.extend(
            ["-k", "--allow-unplayable-formats", "--no-check-certificate"]
                .into_iter()
                .map(OsString::from),
        );
        for header in &self.headers {
            args.push("--add-header".into());
            args.push(header.into());
        }
        args.push("-f".into());
        args.push(request.track.format_selector().into());
        args.push(request.manifest_url.as_str().into());
        args.push("-o".into());
        args.push(request.output.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl DownloaderPort for YtDlpDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<(), PortError> {
        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        run_with_timeout(&self.program, &self.args(request), self.timeout).await?;
        info!(track = %request.track, output = %request.output.display(), "download finished");
        Ok(())
    }
}
