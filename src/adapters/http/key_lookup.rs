use crate::config::{RecorderConfig, BROWSER_USER_AGENT};
use crate::domain::keys::KeyResponse;
use crate::domain::{KeyRecord, TimeRange};
use crate::error::PortError;
use crate::ports::key_lookup::KeyLookupPort;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Key lookup over HTTP: `GET <url>?id=<channel>&begin=<start>&end=<end>`
/// answering `{"keys":[{"key":"..."}]}`.
#[derive(Debug, Clone)]
pub struct HttpKeyLookup {
    client: Client,
    url: String,
}

impl HttpKeyLookup {
    pub fn new(config: &RecorderConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(config.key_request_timeout)
            .build()?;
        Ok(Self {
            client,
            url: config.key_service_url.clone(),
        })
    }
}

#[async_trait]
impl KeyLookupPort for HttpKeyLookup {
    async fn lookup(
        &self,
        channel_id: u32,
        range: &TimeRange,
    ) -> Result<Vec<KeyRecord>, PortError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("id", channel_id as i64),
                ("begin", range.start()),
                ("end", range.end()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: KeyResponse = response.json().await?;
        debug!(channel_id, begin = range.start(), keys = body.keys.len(), "key lookup answered");
        Ok(body.keys)
    }
}
