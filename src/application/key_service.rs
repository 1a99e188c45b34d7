use super::retry::retry;
use crate::config::RetryPolicy;
use crate::domain::{KeyRecord, TimeRange};
use crate::error::RecorderError;
use crate::ports::key_lookup::KeyLookupPort;
use std::sync::Arc;
use tracing::debug;

/// Key-lookup client with a bounded retry budget.
pub struct KeyService<L> {
    lookup: Arc<L>,
    retry: RetryPolicy,
}

impl<L> Clone for KeyService<L> {
    fn clone(&self) -> Self {
        Self {
            lookup: self.lookup.clone(),
            retry: self.retry,
        }
    }
}

impl<L: KeyLookupPort> KeyService<L> {
    pub fn new(lookup: Arc<L>, retry: RetryPolicy) -> Self {
        Self { lookup, retry }
    }

    /// Keys observed over `range`, retried on any transport or status failure.
    pub async fn fetch_keys(
        &self,
        range: &TimeRange,
        channel_id: u32,
    ) -> Result<Vec<KeyRecord>, RecorderError> {
        let keys = retry(&self.retry, "key lookup", || {
            self.lookup.lookup(channel_id, range)
        })
        .await
        .map_err(|e| {
            RecorderError::KeyUnavailable(format!(
                "{} attempts for {}..{} failed: {}",
                self.retry.attempts,
                range.start(),
                range.end(),
                e
            ))
        })?;
        debug!(
            channel_id,
            begin = range.start(),
            end = range.end(),
            count = keys.len(),
            "keys fetched"
        );
        Ok(keys)
    }

    /// The key active over `range`: the first record returned.
    pub async fn active_key(
        &self,
        range: &TimeRange,
        channel_id: u32,
    ) -> Result<KeyRecord, RecorderError> {
        self.fetch_keys(range, channel_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                RecorderError::KeyUnavailable(format!(
                    "no key returned for {}..{}",
                    range.start(),
                    range.end()
                ))
            })
    }
}
