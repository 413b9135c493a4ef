use reqwest::{header, Client};
use serde::Serialize;
use std::time::Duration;

use crate::constants::FORWARD_KEY_HEADER;
use crate::errors::{RelayError, RelayResult};

/// Mirrors log entries to a remote collector.
pub struct Forwarder {
    client: Client,
    url: String,
    key: Option<String>,
}

impl Forwarder {
    pub fn new(url: impl Into<String>, key: Option<String>, timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            key,
        })
    }

    /// POSTs `entry` to the collector, with the shared secret header when set.
    pub async fn forward<T: Serialize + ?Sized>(&self, entry: &T) -> RelayResult<()> {
        let mut request = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(entry);
        if let Some(key) = &self.key {
            request = request.header(FORWARD_KEY_HEADER, key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RelayError::ApiError(format!(
                "Log collector answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}
