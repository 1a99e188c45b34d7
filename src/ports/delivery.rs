use crate::error::PortError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

/// Descriptive metadata travelling with the final artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryMetadata {
    pub job_id: String,
    pub channel_id: u32,
    pub start: i64,
    pub end: i64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub metadata: DeliveryMetadata,
}

/// Receives the cumulative number of bytes transferred.
pub type ProgressFn<'a> = &'a (dyn Fn(u64) + Send + Sync);

#[async_trait]
pub trait DeliveryPort: Send + Sync {
    /// Transfer the artifact, reporting progress as it goes. Returns a
    /// description of where it landed.
    async fn deliver(
        &self,
        request: &DeliveryRequest,
        progress: ProgressFn<'_>,
    ) -> Result<String, PortError>;
}
