use crate::error::PortError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaToolPort: Send + Sync {
    /// Decrypt both inputs with `key` and mux the first video stream of `video`
    /// with the first audio stream of `audio` into `output`, without re-encoding.
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        key: &str,
        output: &Path,
    ) -> Result<(), PortError>;

    /// Stream-copy concatenation of `inputs`, in order, into `output`.
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<(), PortError>;
}
