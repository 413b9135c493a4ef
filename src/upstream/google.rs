use crate::config::Config;
use crate::errors::{RelayError, RelayResult};
use crate::pool::Credential;
use crate::upstream::client::UpstreamClient;
use crate::upstream::outcome::Outcome;
use crate::upstream::types::GenerationRequest;

use async_trait::async_trait;
use log::debug;
use reqwest::{header, Client};
use std::time::Duration;
use url::Url;

/// Upstream client for Google's generative-language `generateContent` API
pub struct GoogleUpstream {
    client: Client,
    base_url: String,
    model: String,
}

impl GoogleUpstream {
    /// Creates a new Google upstream client
    ///
    /// # Parameters
    /// * `base_url` - Scheme and host of the API, without a trailing slash
    /// * `model` - Model to call (e.g. "gemini-2.5-flash")
    /// * `timeout` - Upper bound for a single attempt
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Creates the client described by the relay configuration
    pub fn from_config(config: &Config) -> RelayResult<Self> {
        Self::new(&config.upstream_base_url, &config.model, config.upstream_timeout())
    }

    /// Builds `{base}/v1beta/models/{model}:generateContent?key={credential}`
    fn endpoint(&self, credential: &Credential) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        ))?;
        url.query_pairs_mut().append_pair("key", credential.secret());
        Ok(url)
    }
}

#[async_trait]
impl UpstreamClient for GoogleUpstream {
    /// Sends the request with one credential and classifies the answer
    ///
    /// # Parameters
    /// * `credential` - API key for this attempt
    /// * `request` - The caller's payload, forwarded as `{ contents }`
    ///
    /// # Returns
    /// * `Outcome` - Never an error: transport failures become `NetworkError`
    async fn generate(&self, credential: &Credential, request: &GenerationRequest) -> Outcome {
        let url = match self.endpoint(credential) {
            Ok(url) => url,
            Err(e) => return Outcome::NetworkError(format!("Invalid upstream URL: {}", e)),
        };

        let response = match self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            // The URL carries the key, strip it before the error goes anywhere.
            Err(e) => return Outcome::NetworkError(e.without_url().to_string()),
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Outcome::NetworkError(e.without_url().to_string()),
        };

        let outcome = Outcome::classify(status, &body);
        debug!("Upstream {} ({}) answered {} -> {}", self.get_name(), self.model, status, outcome.label());
        outcome
    }

    /// Returns backend name
    fn get_name(&self) -> &str {
        "google"
    }

    /// Returns current model name
    fn get_model(&self) -> &str {
        &self.model
    }
}
