//! Configuration file loading, environment loading and `${VAR}` resolution.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use regex::Regex;
use url::Url;

use crate::errors::{RelayError, RelayResult};
use super::types::Config;

/// Load and parse a TOML configuration file.
///
/// # Arguments
/// * `path` - Path to the TOML configuration file
///
/// # Returns
/// * `RelayResult<Config>` - Parsed configuration with environment variables resolved
///
/// # Example
/// ```no_run
/// use keyrelay::config::load_config;
///
/// let config = load_config("keyrelay.toml").unwrap();
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> RelayResult<Config> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| {
        RelayError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&content)
}

/// Parse a TOML configuration string, resolving `${VAR}` references
/// against the process environment.
pub fn parse_config(content: &str) -> RelayResult<Config> {
    parse_config_with(content, |name| env::var(name).ok())
}

/// Parse a TOML configuration string, resolving `${VAR}` references
/// through `lookup`.
pub fn parse_config_with<F>(content: &str, lookup: F) -> RelayResult<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config = toml::from_str(content).map_err(|e| {
        RelayError::ConfigError(format!("Failed to parse TOML: {}", e))
    })?;

    resolve_env_vars(&mut config, &lookup)?;
    normalize(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Build a configuration from environment variables read through `lookup`.
///
/// `GEMINI_API_KEYS` takes precedence over `GENERATIVE_API_KEY`. Unset or
/// blank variables fall back to the defaults.
pub fn config_from_lookup<F>(lookup: F) -> RelayResult<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let mut config = Config::default();

    if let Some(keys) = get("GEMINI_API_KEYS").or_else(|| get("GENERATIVE_API_KEY")) {
        config.credentials = vec![keys];
    }
    if let Some(model) = get("GEMINI_MODEL") {
        config.model = model;
    }
    if let Some(base) = get("UPSTREAM_BASE_URL") {
        config.upstream_base_url = base;
    }
    if let Some(secs) = get("UPSTREAM_TIMEOUT_SECS") {
        config.upstream_timeout_secs = secs.trim().parse().map_err(|_| {
            RelayError::ConfigError(format!(
                "UPSTREAM_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                secs
            ))
        })?;
    }
    config.log_forward_url = get("LOG_FORWARD_URL");
    config.log_forward_key = get("LOG_FORWARD_KEY");
    config.log_view_key = get("LOG_VIEW_KEY");
    config.log_receiver_name = get("LOG_RECEIVER_NAME");
    if let Some(dir) = get("LOG_DIR") {
        config.log_dir = dir;
    }
    // An explicitly empty GEO_IP_URL disables lookups, so read it unfiltered.
    if let Some(geo) = lookup("GEO_IP_URL") {
        config.geo_ip_url = geo;
    }
    if let Some(detached) = get("LOG_DETACHED") {
        config.detach_logging = parse_flag(&detached).ok_or_else(|| {
            RelayError::ConfigError(format!(
                "LOG_DETACHED must be a boolean (true/false/1/0), got '{}'",
                detached
            ))
        })?;
    }
    if let Some(bind) = get("BIND_ADDRESS") {
        config.bind_address = bind;
    }

    normalize(&mut config);
    validate_config(&config)?;
    Ok(config)
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> RelayResult<Config> {
        config_from_lookup(|name| env::var(name).ok())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolve environment variable references in the configuration.
///
/// Environment variables are specified using the `${VAR_NAME}` syntax.
/// If a variable is not found, an error is returned with a helpful message.
fn resolve_env_vars<F>(config: &mut Config, lookup: &F) -> RelayResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| RelayError::ConfigError(format!("Invalid env pattern: {}", e)))?;

    for (idx, entry) in config.credentials.iter_mut().enumerate() {
        if let Some(resolved) = resolve_env_var_string(entry, &pattern, lookup)
            .map_err(|var_name| missing_var_error(&var_name, &format!("credentials[{}]", idx)))?
        {
            *entry = resolved;
        }
    }

    let plain_fields: [(&str, &mut String); 4] = [
        ("model", &mut config.model),
        ("upstream_base_url", &mut config.upstream_base_url),
        ("log_dir", &mut config.log_dir),
        ("geo_ip_url", &mut config.geo_ip_url),
    ];
    for (field, value) in plain_fields {
        if let Some(resolved) = resolve_env_var_string(value, &pattern, lookup)
            .map_err(|var_name| missing_var_error(&var_name, field))?
        {
            *value = resolved;
        }
    }

    let optional_fields: [(&str, &mut Option<String>); 4] = [
        ("log_forward_url", &mut config.log_forward_url),
        ("log_forward_key", &mut config.log_forward_key),
        ("log_view_key", &mut config.log_view_key),
        ("log_receiver_name", &mut config.log_receiver_name),
    ];
    for (field, value) in optional_fields {
        if let Some(current) = value.as_deref() {
            if let Some(resolved) = resolve_env_var_string(current, &pattern, lookup)
                .map_err(|var_name| missing_var_error(&var_name, field))?
            {
                *value = Some(resolved);
            }
        }
    }

    Ok(())
}

/// Resolve environment variables in a single string.
/// Returns None if no env vars are present, Some(resolved) if all resolved
/// successfully, and the missing variable name otherwise.
fn resolve_env_var_string<F>(s: &str, pattern: &Regex, lookup: &F) -> Result<Option<String>, String>
where
    F: Fn(&str) -> Option<String>,
{
    if !pattern.is_match(s) {
        return Ok(None);
    }

    let mut result = s.to_string();

    for caps in pattern.captures_iter(s) {
        let full_match = &caps[0];
        let var_name = &caps[1];

        match lookup(var_name) {
            Some(value) => {
                result = result.replace(full_match, &value);
            }
            None => return Err(var_name.to_string()),
        }
    }

    Ok(Some(result))
}

fn missing_var_error(var_name: &str, field: &str) -> RelayError {
    RelayError::ConfigError(format!(
        "Environment variable '{}' not found\n  \
         → Referenced in {}\n  \
         → Set it with: export {}=\"your-value\"",
        var_name, field, var_name
    ))
}

/// Blank optional values mean "not configured".
fn normalize(config: &mut Config) {
    for value in [
        &mut config.log_forward_url,
        &mut config.log_forward_key,
        &mut config.log_view_key,
        &mut config.log_receiver_name,
    ] {
        *value = value.take().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    }
    config.model = config.model.trim().to_string();
    config.upstream_base_url = config.upstream_base_url.trim().trim_end_matches('/').to_string();
    config.geo_ip_url = config.geo_ip_url.trim().trim_end_matches('/').to_string();
}

/// Validate the configuration for consistency.
fn validate_config(config: &Config) -> RelayResult<()> {
    if config.model.is_empty() {
        return Err(RelayError::ConfigError(
            "Model name must not be empty\n  → Set GEMINI_MODEL or remove it to use the default".to_string(),
        ));
    }

    if config.upstream_timeout_secs == 0 {
        return Err(RelayError::ConfigError(
            "upstream_timeout_secs must be greater than zero".to_string(),
        ));
    }

    Url::parse(&config.upstream_base_url).map_err(|e| {
        RelayError::ConfigError(format!(
            "Invalid upstream base URL '{}': {}",
            config.upstream_base_url, e
        ))
    })?;

    if config.geo_enabled() {
        Url::parse(&config.geo_ip_url).map_err(|e| {
            RelayError::ConfigError(format!(
                "Invalid geolocation URL '{}': {}",
                config.geo_ip_url, e
            ))
        })?;
    }

    if let Some(forward) = &config.log_forward_url {
        Url::parse(forward).map_err(|e| {
            RelayError::ConfigError(format!("Invalid log forward URL '{}': {}", forward, e))
        })?;
    }

    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        RelayError::ConfigError(format!(
            "Invalid bind address '{}': {}\n  → Expected host:port, e.g. 0.0.0.0:3000",
            config.bind_address, e
        ))
    })?;

    if config.credential_pool().is_empty() {
        log::warn!("No upstream API keys configured; generation requests will fail until GEMINI_API_KEYS is set");
    }

    Ok(())
}
