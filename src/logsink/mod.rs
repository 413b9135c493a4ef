//! Durable record of successful exchanges.
//!
//! Every part of this module is best-effort: geolocation, the store append
//! and the remote forward each catch their own failures and report them to
//! the operator log. Nothing here can fail a caller's request.

pub mod entry;
pub mod geo;
pub mod store;
pub mod forward;

pub use entry::{CallerInfo, LogEntry, NetworkInfo};
pub use forward::Forwarder;
pub use geo::{GeoInfo, GeoLocator};
pub use store::{LogStore, StoreSet, StoreStat};

use log::{debug, error, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::constants::COLLABORATOR_TIMEOUT_SECS;
use crate::errors::RelayResult;

/// Stage of the sink pipeline, used as a metric label.
pub mod stage {
    pub const GEO: &str = "geo";
    pub const APPEND: &str = "append";
    pub const FORWARD: &str = "forward";
    pub const ENCODE: &str = "encode";
}

/// Builds log entries and hands them to the store and the collector.
pub struct LogSink {
    store: Arc<LogStore>,
    geo: Option<GeoLocator>,
    forwarder: Option<Forwarder>,
}

impl LogSink {
    pub fn new(store: Arc<LogStore>, geo: Option<GeoLocator>, forwarder: Option<Forwarder>) -> Self {
        Self { store, geo, forwarder }
    }

    /// Sink writing to `store`, with geolocation and forwarding as configured.
    pub fn from_config(config: &Config, store: Arc<LogStore>) -> RelayResult<Self> {
        let timeout = Duration::from_secs(COLLABORATOR_TIMEOUT_SECS);

        let geo = if config.geo_enabled() {
            Some(GeoLocator::new(&config.geo_ip_url, timeout)?)
        } else {
            None
        };

        let forwarder = match &config.log_forward_url {
            Some(url) => Some(Forwarder::new(url, config.log_forward_key.clone(), timeout)?),
            None => None,
        };

        Ok(Self::new(store, geo, forwarder))
    }

    /// Records one successful exchange. Never fails.
    pub async fn record(&self, caller: CallerInfo, contents: Value, response: Value) {
        let geo = match &self.geo {
            Some(locator) => match locator.lookup(&caller.ip).await {
                Ok(geo) => geo,
                Err(e) => {
                    warn!("Geolocation lookup failed: {}", e);
                    note_failure(stage::GEO);
                    None
                }
            },
            None => None,
        };

        let entry = LogEntry::new(caller, geo, contents, response);

        let value = match serde_json::to_value(&entry) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to encode log entry {}: {}", entry.id, e);
                note_failure(stage::ENCODE);
                return;
            }
        };

        match self.store.append(value).await {
            Ok(()) => debug!("Log entry {} written to {}", entry.id, self.store.path().display()),
            Err(e) => {
                error!("Failed to write log: {}", e);
                note_failure(stage::APPEND);
            }
        }

        if let Some(forwarder) = &self.forwarder {
            if let Err(e) = forwarder.forward(&entry).await {
                error!("Forwarding log failed: {}", e);
                note_failure(stage::FORWARD);
            }
        }
    }
}

#[cfg(feature = "metrics")]
fn note_failure(stage: &'static str) {
    crate::metrics::record_log_failure(stage);
}

#[cfg(not(feature = "metrics"))]
fn note_failure(_stage: &'static str) {}
