use std::error::Error;
use std::fmt;

/// Custom error types for relay operations
#[derive(Debug)]
pub enum RelayError {
    /// Error from the HTTP client
    RequestError(reqwest::Error),
    /// Non-success answer from a collaborator service (geolocation, log collector)
    ApiError(String),
    /// Parsing error
    ParseError(String),
    /// Configuration error
    ConfigError(String),
    /// Log store read/write error
    StorageError(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::RequestError(err) => write!(f, "Request error: {}", err),
            RelayError::ApiError(msg) => write!(f, "API error: {}", msg),
            RelayError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            RelayError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            RelayError::StorageError(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl Error for RelayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RelayError::RequestError(err) => Some(err),
            _ => None,
        }
    }
}

/// Convert reqwest errors to RelayError
impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::RequestError(err)
    }
}

/// Convert serde_json errors to RelayError
impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::ParseError(err.to_string())
    }
}

/// Convert std::io::Error to RelayError
impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::StorageError(err.to_string())
    }
}

/// Convert toml parsing errors to RelayError
impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::ConfigError(err.to_string())
    }
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
