//! keyrelay is a generation proxy that spreads requests over a pool of
//! upstream API keys.
//!
//! It accepts chat-style generation requests, relays them to Google's
//! generative-language API with the first key that still has quota, and
//! keeps a durable log of every successful exchange.
//!
//! # Features
//!
//! - **Key failover**: keys are tried in order; a 429 or a network failure
//!   moves on to the next key, any other upstream error is returned as-is
//! - **Exchange log**: newest-first JSON store with caller metadata and
//!   best-effort geolocation, optionally mirrored to a remote collector
//! - **Log viewer**: filtered, key-protected read endpoint plus a debug
//!   inspector
//! - **Metrics tracking**: attempts, failovers and latency (`metrics` feature)
//!
//! # Example
//!
//! ```no_run
//! use keyrelay::{Config, RelayServer};
//!
//! async fn example() {
//!     let config = Config::from_env().expect("invalid configuration");
//!     let server = RelayServer::new(config).expect("failed to build server");
//!     server.start().await.expect("server stopped");
//! }
//! ```

pub mod errors;
pub mod constants;
pub mod config;
pub mod pool;
pub mod upstream;
pub mod extract;
pub mod logsink;
pub mod server;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use config::Config;
pub use errors::{RelayError, RelayResult};
pub use pool::{Credential, CredentialPool, FailoverCoordinator, FailoverError, LastError};
pub use upstream::{GenerationRequest, GoogleUpstream, Outcome, UpstreamClient};
pub use extract::extract_text;
pub use logsink::{CallerInfo, LogEntry, LogSink, LogStore};
pub use server::RelayServer;

#[cfg(feature = "metrics")]
pub use crate::metrics::describe_metrics;

/// Initialize the logging system
///
/// Call this at the start of the binary to route the crate's `log`
/// output through `env_logger` (controlled by `RUST_LOG`).
pub fn use_logging() {
    env_logger::init();
}
