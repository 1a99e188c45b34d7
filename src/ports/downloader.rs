use crate::domain::Track;
use crate::error::PortError;
use async_trait::async_trait;
use std::path::PathBuf;

/// One elementary-stream retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub manifest_url: String,
    pub track: Track,
    pub output: PathBuf,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DownloaderPort: Send + Sync {
    /// Fetch the encrypted stream into `request.output`. A timeout is an error.
    async fn download(&self, request: &DownloadRequest) -> Result<(), PortError>;
}
