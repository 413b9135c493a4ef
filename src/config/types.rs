//! Configuration types.
//!
//! These map directly to the TOML configuration file structure and to the
//! environment variables read by [`Config::from_env`](super::Config::from_env).

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::constants;
use crate::pool::CredentialPool;

/// Root configuration structure, loaded once at process start.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Upstream API keys, in failover order. Accepts a list or a comma-separated string.
    #[serde(default, deserialize_with = "deserialize_credentials")]
    pub credentials: Vec<String>,

    /// Upstream model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Scheme and host of the upstream generative-language API.
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Timeout applied to every single upstream attempt.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Collector URL that receives a copy of every log entry.
    pub log_forward_url: Option<String>,

    /// Shared secret sent to (and expected from) the log collector.
    pub log_forward_key: Option<String>,

    /// Access key protecting the log viewer.
    pub log_view_key: Option<String>,

    /// Display name of this log receiver.
    pub log_receiver_name: Option<String>,

    /// Directory holding the JSON log stores.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Geolocation service base URL. Empty disables lookups.
    #[serde(default = "default_geo_ip_url")]
    pub geo_ip_url: String,

    /// Run the log sink on a background task instead of before the response.
    #[serde(default = "default_true")]
    pub detach_logging: bool,

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
            model: default_model(),
            upstream_base_url: default_upstream_base_url(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            log_forward_url: None,
            log_forward_key: None,
            log_view_key: None,
            log_receiver_name: None,
            log_dir: default_log_dir(),
            geo_ip_url: default_geo_ip_url(),
            detach_logging: default_true(),
            bind_address: default_bind_address(),
        }
    }
}

impl Config {
    /// Builds the ordered credential pool from the configured entries.
    pub fn credential_pool(&self) -> CredentialPool {
        CredentialPool::from_entries(&self.credentials)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn geo_enabled(&self) -> bool {
        !self.geo_ip_url.trim().is_empty()
    }

    /// Path of a store file inside the log directory.
    pub fn log_path(&self, file_name: &str) -> PathBuf {
        PathBuf::from(&self.log_dir).join(file_name)
    }
}

// Secrets stay out of debug output.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("credentials", &format_args!("<{} redacted>", self.credentials.len()))
            .field("model", &self.model)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("log_forward_url", &self.log_forward_url)
            .field("log_forward_key", &self.log_forward_key.as_ref().map(|_| "<redacted>"))
            .field("log_view_key", &self.log_view_key.as_ref().map(|_| "<redacted>"))
            .field("log_receiver_name", &self.log_receiver_name)
            .field("log_dir", &self.log_dir)
            .field("geo_ip_url", &self.geo_ip_url)
            .field("detach_logging", &self.detach_logging)
            .field("bind_address", &self.bind_address)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CredentialField {
    List(Vec<String>),
    Joined(String),
}

fn deserialize_credentials<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match CredentialField::deserialize(deserializer)? {
        CredentialField::List(list) => list,
        CredentialField::Joined(joined) => vec![joined],
    })
}

fn default_model() -> String {
    constants::DEFAULT_MODEL.to_string()
}

fn default_upstream_base_url() -> String {
    constants::UPSTREAM_API_BASE.to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    constants::DEFAULT_UPSTREAM_TIMEOUT_SECS
}

fn default_log_dir() -> String {
    constants::DEFAULT_LOG_DIR.to_string()
}

fn default_geo_ip_url() -> String {
    constants::GEO_IP_API_BASE.to_string()
}

fn default_bind_address() -> String {
    constants::DEFAULT_BIND_ADDRESS.to_string()
}

fn default_true() -> bool {
    true
}
