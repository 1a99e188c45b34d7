use crate::domain::{KeyRecord, TimeRange};
use crate::error::PortError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyLookupPort: Send + Sync {
    /// Single query for the keys observed on `channel_id` over `range`.
    /// Retries are the caller's concern.
    async fn lookup(&self, channel_id: u32, range: &TimeRange)
        -> Result<Vec<KeyRecord>, PortError>;
}
