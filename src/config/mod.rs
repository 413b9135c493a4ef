//! Configuration for the relay.
//!
//! Configuration is loaded once at process start into an immutable
//! [`Config`], either from environment variables or from a TOML file, and
//! passed explicitly to the server and the failover coordinator.
//!
//! # Example Configuration File
//!
//! ```toml
//! credentials = ["${GEMINI_KEY_A}", "${GEMINI_KEY_B}"]
//! model = "gemini-2.5-flash"
//! log_dir = "./logs"
//! log_forward_url = "https://collector.example.com/api/receive"
//! log_forward_key = "${LOG_FORWARD_KEY}"
//! ```
//!
//! # Environment Variables
//!
//! String values can reference environment variables using the
//! `${VAR_NAME}` syntax. These are resolved at load time.

mod types;
mod loader;

pub use types::Config;
pub use loader::{load_config, parse_config, parse_config_with, config_from_lookup};
