// Upstream
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const UPSTREAM_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

// Log store
pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const PRIMARY_LOG_FILE: &str = "logs.json";
pub const RECEIVED_LOG_FILE: &str = "received.json";
pub const VISITS_LOG_FILE: &str = "visits.json";
pub const MAX_LOG_ENTRIES: usize = 1000;
pub const RESPONSE_SUMMARY_CHARS: usize = 1000;
pub const FORWARD_KEY_HEADER: &str = "x-log-forward-key";
pub const VIEW_KEY_HEADER: &str = "x-log-key";
pub const DEFAULT_VIEW_LIMIT: usize = 100;

// Text extraction
pub const MAX_EXTRACTED_CHARS: usize = 8000;
pub const MAX_EXTRACT_DEPTH: usize = 64;

// Geolocation
pub const GEO_IP_API_BASE: &str = "http://ip-api.com/json";
pub const GEO_IP_FIELDS: &str = "status,country,regionName,city,lat,lon,query,message,isp,org";
pub const COLLABORATOR_TIMEOUT_SECS: u64 = 10;

// Server
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
