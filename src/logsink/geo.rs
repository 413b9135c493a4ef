use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

use crate::constants::GEO_IP_FIELDS;
use crate::errors::{RelayError, RelayResult};

/// Answer of the IP geolocation service (ip-api.com field set).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

/// Client for the IP geolocation service. Results are advisory only.
pub struct GeoLocator {
    client: Client,
    base_url: Url,
}

impl GeoLocator {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let raw = base_url.as_ref();
        let base_url = Url::parse(raw)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| RelayError::ConfigError(format!("Invalid geolocation URL '{}'", raw)))?;

        Ok(Self { client, base_url })
    }

    /// `{base}/{ip}?fields=...`, with the address as a single path segment.
    fn endpoint(&self, ip: IpAddr) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&ip.to_string());
        }
        url.query_pairs_mut().clear().append_pair("fields", GEO_IP_FIELDS);
        url
    }

    /// Looks up `ip`.
    ///
    /// # Returns
    /// * `Ok(Some(geo))` - The service answered with `status == "success"`
    /// * `Ok(None)` - Not an IP address, or the service could not locate it
    /// * `Err` - Transport failure or non-2xx answer
    pub async fn lookup(&self, ip: &str) -> RelayResult<Option<GeoInfo>> {
        let Ok(addr) = ip.trim().parse::<IpAddr>() else {
            return Ok(None);
        };

        let response = self.client.get(self.endpoint(addr)).send().await?;

        if !response.status().is_success() {
            return Err(RelayError::ApiError(format!(
                "Geolocation service answered {}",
                response.status()
            )));
        }

        let geo: GeoInfo = response.json().await?;
        if geo.status.as_deref() != Some("success") {
            debug!("Geolocation for {} unavailable: {:?}", addr, geo.message);
            return Ok(None);
        }

        Ok(Some(geo))
    }
}
